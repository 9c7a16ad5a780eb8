//! HIR layer tests
//!
//! Symbol tables, reference resolution and grammar checks, observed through
//! a registry the way an editor would see them.

use rulesmith::hir::{DiagnosticKind, ReferenceKind, Resolution, SymbolKind};
use rulesmith::{GrammarRegistry, Severity};

use crate::helpers::{EXPR, assert_no_errors, count_kind, kinds, registry_with};

fn single(path: &str, text: &str) -> GrammarRegistry {
    registry_with(&[(path, text)])
}

// ============================================================================
// SYMBOL TABLES
// ============================================================================

#[test]
fn test_symbols_in_declaration_order() {
    let registry = single(
        "/g/L.g4",
        "lexer grammar L;\nchannels { COMMENTS }\ntokens { VIRT }\nA : 'a' ;\nmode INSIDE;\nB : 'b' ;\n",
    );
    let file = registry.file("/g/L.g4").unwrap();
    let symbols: Vec<(&str, SymbolKind)> = file
        .symbols()
        .iter()
        .map(|s| (s.name.as_str(), s.kind))
        .collect();
    assert_eq!(
        symbols,
        vec![
            ("L", SymbolKind::Grammar),
            ("COMMENTS", SymbolKind::TokenChannel),
            ("VIRT", SymbolKind::VirtualToken),
            ("A", SymbolKind::LexerRule),
            ("INSIDE", SymbolKind::LexerMode),
            ("B", SymbolKind::LexerRule),
        ]
    );
    assert_eq!(file.table().rule("B").and_then(|s| s.mode.as_deref()), Some("INSIDE"));
}

#[test]
fn test_duplicate_rule_reported_once_and_kept() {
    let registry = single("/g/G.g4", "grammar G;\nexpr : A ;\nexpr : B ;\nA : 'a' ;\nB : 'b' ;\n");
    let diagnostics = registry.diagnostics("/g/G.g4");
    assert_eq!(count_kind(&diagnostics, DiagnosticKind::DuplicateDeclaration), 1);

    let symbols = registry.analysis().document_symbols("/g/G.g4");
    let exprs = symbols.iter().filter(|s| s.name == "expr").count();
    assert_eq!(exprs, 2);
}

#[test]
fn test_analysis_is_deterministic() {
    let text = "grammar G;\nr : A missing 'lit' ;\nr : B ;\nA : 'a' ;\nB : A ;\n";
    let first = single("/g/G.g4", text);
    let second = single("/g/G.g4", text);
    let a = first.file("/g/G.g4").unwrap();
    let b = second.file("/g/G.g4").unwrap();
    assert_eq!(a.symbols(), b.symbols());
    assert_eq!(a.diagnostics(), b.diagnostics());
    assert_eq!(a.references().len(), b.references().len());
}

#[test]
fn test_ranges_lie_within_text() {
    let text = "grammar G;\nr : ( A | missing ;\nB : 'b\nfragment D : [0-9 ;\n";
    let registry = single("/g/G.g4", text);
    let file = registry.file("/g/G.g4").unwrap();
    let len = text.len();
    for symbol in file.symbols() {
        assert!(usize::from(symbol.range.end()) <= len, "{symbol:?}");
        assert!(symbol.decl_range.contains_range(symbol.range), "{symbol:?}");
    }
    for reference in file.references() {
        assert!(usize::from(reference.range.end()) <= len, "{reference:?}");
    }
    for diagnostic in file.diagnostics() {
        assert!(usize::from(diagnostic.range.end()) <= len, "{diagnostic:?}");
    }
}

#[test]
fn test_broken_rule_still_yields_symbols() {
    let registry = single("/g/G.g4", "grammar G;\nr : A\nA : 'a' ;\n");
    let file = registry.file("/g/G.g4").unwrap();
    assert_eq!(count_kind(file.diagnostics(), DiagnosticKind::SyntaxError), 1);
    assert!(file.table().rule("r").is_some());
    assert!(file.table().rule("A").is_some());
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[test]
fn test_unresolved_rule_reference() {
    let registry = single("/g/G.g4", "grammar G;\nr : missing ;\n");
    let diagnostics = registry.diagnostics("/g/G.g4");
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedReference]);
    assert_eq!(
        &*diagnostics[0].message,
        "unresolved reference: rule 'missing' is not declared"
    );
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn test_references_record_kind_and_enclosing_rule() {
    let registry = single("/g/Expr.g4", EXPR);
    let file = registry.file("/g/Expr.g4").unwrap();
    let summary: Vec<(&str, ReferenceKind, Option<&str>)> = file
        .references()
        .iter()
        .map(|r| (r.name.as_str(), r.kind, r.enclosing_rule.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("expr", ReferenceKind::Rule, Some("expr")),
            ("'*'", ReferenceKind::Literal, Some("expr")),
            ("expr", ReferenceKind::Rule, Some("expr")),
            ("INT", ReferenceKind::Token, Some("expr")),
        ]
    );
    for reference in file.references() {
        match reference.kind {
            ReferenceKind::Literal => assert_eq!(reference.resolution, Resolution::BuiltIn),
            _ => assert!(reference.resolution.is_resolved(), "{reference:?}"),
        }
    }
}

#[test]
fn test_built_in_names_resolve() {
    let registry = single(
        "/g/L.g4",
        "lexer grammar L;\nWS : ' ' -> channel(HIDDEN) ;\nOPEN : '<' -> pushMode(IN) ;\nmode IN;\nCLOSE : '>' -> mode(DEFAULT_MODE) ;\n",
    );
    assert!(registry.diagnostics("/g/L.g4").is_empty(), "{:?}", registry.diagnostics("/g/L.g4"));

    let registry = single("/g/G.g4", "grammar G;\nr : A EOF ;\nA : 'a' ;\n");
    let file = registry.file("/g/G.g4").unwrap();
    let eof = file.references().iter().find(|r| r.name == "EOF").unwrap();
    assert_eq!(eof.resolution, Resolution::BuiltIn);
}

#[test]
fn test_unknown_mode_is_unresolved() {
    let registry = single("/g/L.g4", "lexer grammar L;\nA : 'a' -> pushMode(NOPE) ;\n");
    let diagnostics = registry.diagnostics("/g/L.g4");
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedReference]);
    assert!(diagnostics[0].message.contains("mode 'NOPE'"));
}

#[test]
fn test_literal_resolves_to_defining_lexer_rule() {
    let registry = single("/g/G.g4", "grammar G;\nr : 'if' ;\nIF : 'if' ;\n");
    let file = registry.file("/g/G.g4").unwrap();
    let literal = &file.references()[0];
    assert_eq!(literal.kind, ReferenceKind::Literal);
    assert_eq!(literal.resolution.definition().map(|s| s.name.as_str()), Some("IF"));
}

#[test]
fn test_implicit_token_only_in_parser_grammar() {
    let combined = single("/g/G.g4", "grammar G;\nr : 'x' ;\n");
    assert!(combined.diagnostics("/g/G.g4").is_empty());

    let parser = single("/g/P.g4", "parser grammar P;\nr : 'x' ;\n");
    assert_eq!(
        kinds(&parser.diagnostics("/g/P.g4")),
        vec![DiagnosticKind::ImplicitTokenInParser]
    );
}

#[test]
fn test_fragment_in_parser_rule() {
    let registry = single("/g/G.g4", "grammar G;\nr : D ;\nfragment D : [0-9] ;\n");
    assert_eq!(
        kinds(&registry.diagnostics("/g/G.g4")),
        vec![DiagnosticKind::FragmentInParserRule]
    );
}

#[test]
fn test_parser_rule_in_lexer_rule() {
    let registry = single("/g/G.g4", "grammar G;\nr : A ;\nA : r ;\n");
    assert_eq!(
        kinds(&registry.diagnostics("/g/G.g4")),
        vec![DiagnosticKind::ParserRuleInLexerRule]
    );
}

// ============================================================================
// CHECKS
// ============================================================================

#[test]
fn test_direct_left_recursion_is_accepted() {
    let registry = single("/g/Expr.g4", EXPR);
    assert!(registry.diagnostics("/g/Expr.g4").is_empty());
}

#[test]
fn test_mutual_left_recursion_is_reported() {
    let registry = single("/g/G.g4", "grammar G;\na : b 'x' ;\nb : a | 'y' ;\n");
    let diagnostics = registry.diagnostics("/g/G.g4");
    assert_eq!(count_kind(&diagnostics, DiagnosticKind::LeftRecursion), 2);
    assert!(diagnostics.iter().all(|d| d.message.contains("mutually left-recursive")));
}

#[test]
fn test_grammar_name_must_match_file() {
    let registry = single("/g/Other.g4", "grammar Expr;\nr : 'x' ;\n");
    let diagnostics = registry.diagnostics("/g/Other.g4");
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::GrammarNameMismatch]);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_no_errors(&diagnostics);
}

#[test]
fn test_diagnostics_ordered_by_position() {
    let registry = single("/g/G.g4", "grammar G;\nz : missing ;\na : other ;\nX : y ;\ny : 'q' ;\n");
    let diagnostics = registry.diagnostics("/g/G.g4");
    assert!(diagnostics.len() >= 3, "{diagnostics:?}");
    assert!(
        diagnostics
            .windows(2)
            .all(|pair| pair[0].range.start() <= pair[1].range.start())
    );
}
