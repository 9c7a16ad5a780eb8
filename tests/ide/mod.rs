//! IDE layer tests
//!
//! Queries over committed snapshots: hover, goto, references, code lenses,
//! document symbols and diagrams.

use std::path::PathBuf;

use rulesmith::hir::SymbolKind;
use rulesmith::ide::DiagramNode;
use rulesmith::{Position, QueryError};

use crate::helpers::{BASE, EXPR, MAIN, position_of, registry_with};

// ============================================================================
// HOVER AND GOTO
// ============================================================================

#[test]
fn test_hover_on_imported_rule_names_its_file() {
    let analysis = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]).analysis();
    let hover = analysis
        .hover("/g/Main.g4", position_of(MAIN, "start", 0, 2))
        .unwrap()
        .unwrap();
    assert!(!hover.is_definition);
    assert!(hover.contents.contains("```antlr\nstart\n```"));
    assert!(hover.contents.contains("*parser rule* declared in `Base.g4`"), "{}", hover.contents);
    assert_eq!(hover.span.start, position_of(MAIN, "start", 0, 0));
}

#[test]
fn test_hover_on_unresolved_reference() {
    let text = "grammar G;\nr : nowhere ;\n";
    let analysis = registry_with(&[("/g/G.g4", text)]).analysis();
    let hover = analysis
        .hover("/g/G.g4", position_of(text, "nowhere", 0, 0))
        .unwrap()
        .unwrap();
    assert!(hover.contents.contains("Unresolved rule reference"));
    assert!(hover.symbol.is_none());
}

#[test]
fn test_goto_on_built_in_has_no_target() {
    let analysis = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]).analysis();
    let target = analysis
        .goto_definition("/g/Main.g4", position_of(MAIN, "EOF", 0, 1))
        .unwrap();
    assert!(target.is_none());
}

#[test]
fn test_goto_on_declaration_returns_itself() {
    let analysis = registry_with(&[("/g/Expr.g4", EXPR)]).analysis();
    let target = analysis
        .goto_definition("/g/Expr.g4", Position::new(6, 1))
        .unwrap()
        .unwrap();
    assert_eq!(target.name, "INT");
    assert_eq!(target.kind, SymbolKind::LexerRule);
    assert_eq!(target.path, PathBuf::from("/g/Expr.g4"));
}

#[test]
fn test_goto_from_action_code() {
    let text = "grammar G;\nr : ID {print($ID.text);} ;\nID : [a-z]+ ;\n";
    let analysis = registry_with(&[("/g/G.g4", text)]).analysis();
    let target = analysis
        .goto_definition("/g/G.g4", position_of(text, "$ID", 0, 1))
        .unwrap()
        .unwrap();
    assert_eq!(target.name, "ID");
    assert_eq!(target.span.start, Position::new(2, 0));
}

#[test]
fn test_goto_import_name_opens_grammar() {
    let analysis = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]).analysis();
    let target = analysis
        .goto_definition("/g/Main.g4", position_of(MAIN, "Base", 0, 1))
        .unwrap()
        .unwrap();
    assert_eq!(target.kind, SymbolKind::Grammar);
    assert_eq!(target.path, PathBuf::from("/g/Base.g4"));
}

#[test]
fn test_position_past_end_is_invalid() {
    let analysis = registry_with(&[("/g/Expr.g4", EXPR)]).analysis();
    let result = analysis.find_references("/g/Expr.g4", Position::new(42, 0));
    assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
    let result = analysis.rule_at("/g/Expr.g4", Position::new(0, 80));
    assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
}

// ============================================================================
// REFERENCES AND CODE LENSES
// ============================================================================

#[test]
fn test_references_span_files() {
    let analysis = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]).analysis();
    let refs = analysis
        .find_references("/g/Base.g4", position_of(BASE, "start", 0, 0))
        .unwrap();
    let found: Vec<(PathBuf, bool)> = refs.into_iter().map(|r| (r.path, r.is_definition)).collect();
    assert_eq!(
        found,
        vec![
            (PathBuf::from("/g/Base.g4"), true),
            (PathBuf::from("/g/Main.g4"), false),
        ]
    );
}

#[test]
fn test_code_lenses_count_importers() {
    let analysis = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]).analysis();
    let lenses: Vec<(String, usize)> = analysis
        .code_lenses("/g/Base.g4")
        .into_iter()
        .map(|lens| (lens.name.to_string(), lens.reference_count))
        .collect();
    assert_eq!(lenses, vec![("start".to_string(), 1), ("ID".to_string(), 1)]);

    let main = analysis.code_lenses("/g/Main.g4");
    assert_eq!(main.len(), 1);
    assert_eq!(main[0].title(), "0 references");
}

// ============================================================================
// DOCUMENT SYMBOLS
// ============================================================================

#[test]
fn test_document_symbols_carry_mode_and_signature() {
    let text = "lexer grammar L;\nA : 'a' -> pushMode(IN) ;\nmode IN;\nB : 'b' -> popMode ;\n";
    let analysis = registry_with(&[("/g/L.g4", text)]).analysis();
    let symbols = analysis.document_symbols("/g/L.g4");
    let b = symbols.iter().find(|s| s.name == "B").unwrap();
    assert_eq!(b.container_name.as_deref(), Some("IN"));
    assert_eq!(b.kind, SymbolKind::LexerRule);
    let a = symbols.iter().find(|s| s.name == "A").unwrap();
    assert_eq!(a.container_name, None);
}

// ============================================================================
// DIAGRAMS
// ============================================================================

#[test]
fn test_diagram_of_alternatives() {
    let analysis = registry_with(&[("/g/Expr.g4", EXPR)]).analysis();
    let diagram = analysis.diagram_source("/g/Expr.g4", "expr").unwrap().unwrap();
    assert_eq!(diagram.kind, SymbolKind::ParserRule);
    assert_eq!(
        diagram.root,
        DiagramNode::Choice(vec![
            DiagramNode::Sequence(vec![
                DiagramNode::NonTerminal("expr".into()),
                DiagramNode::Literal("'*'".into()),
                DiagramNode::NonTerminal("expr".into()),
            ]),
            DiagramNode::Terminal("INT".into()),
        ])
    );
}

#[test]
fn test_diagram_of_lexer_rule_with_commands() {
    let text = "lexer grammar L;\nWS : [ \\t]+ -> skip ;\nNUM : ('0'..'9')+ ;\n";
    let analysis = registry_with(&[("/g/L.g4", text)]).analysis();

    let ws = analysis.diagram_source("/g/L.g4", "WS").unwrap().unwrap();
    assert_eq!(ws.kind, SymbolKind::LexerRule);
    assert_eq!(
        ws.root,
        DiagramNode::Sequence(vec![
            DiagramNode::OneOrMore(Box::new(DiagramNode::CharSet("[ \\t]".into()))),
            DiagramNode::Commands(vec!["skip".into()]),
        ])
    );

    let num = analysis.diagram_source("/g/L.g4", "NUM").unwrap().unwrap();
    assert_eq!(
        num.root,
        DiagramNode::OneOrMore(Box::new(DiagramNode::CharSet("'0'..'9'".into())))
    );
}

#[test]
fn test_diagram_lookup_failures() {
    let analysis = registry_with(&[("/g/Expr.g4", EXPR)]).analysis();
    assert_eq!(analysis.diagram_source("/g/Expr.g4", "missing"), Ok(None));
    assert_eq!(analysis.diagram_source("/g/Other.g4", "expr"), Ok(None));
    assert!(matches!(
        analysis.diagram_source("/g/Expr.g4", "not a rule"),
        Err(QueryError::InvalidArgument(_))
    ));
    assert!(matches!(
        analysis.diagram_source("/g/Expr.g4", ""),
        Err(QueryError::InvalidArgument(_))
    ));
}

#[test]
fn test_rule_at_selects_enclosing_rule() {
    let analysis = registry_with(&[("/g/Expr.g4", EXPR)]).analysis();
    assert_eq!(
        analysis.rule_at("/g/Expr.g4", Position::new(4, 8)).unwrap().as_deref(),
        Some("expr")
    );
    assert_eq!(
        analysis.rule_at("/g/Expr.g4", Position::new(6, 4)).unwrap().as_deref(),
        Some("INT")
    );
    assert_eq!(analysis.rule_at("/g/Expr.g4", Position::new(1, 0)), Ok(None));
}
