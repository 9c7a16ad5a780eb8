//! Registry tests
//!
//! Cross-file resolution, import cycles, debounced edits and supersession.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rulesmith::hir::{DiagnosticKind, Resolution, Severity};
use rulesmith::registry::EditPhase;
use rulesmith::{GrammarRegistry, ImportPrecedence, Position, RegistryConfig};

use crate::helpers::{BASE, MAIN, count_kind, kinds, position_of, registry_with};

const DEBOUNCE: Duration = Duration::from_millis(300);

// ============================================================================
// IMPORTS
// ============================================================================

#[test]
fn test_imported_rule_resolves_across_files() {
    let registry = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]);
    assert!(registry.diagnostics("/g/Main.g4").is_empty(), "{:?}", registry.diagnostics("/g/Main.g4"));

    let target = registry
        .analysis()
        .goto_definition("/g/Main.g4", position_of(MAIN, "start", 0, 1))
        .unwrap()
        .unwrap();
    assert_eq!(target.path, PathBuf::from("/g/Base.g4"));
    assert_eq!(target.name, "start");
    assert_eq!(target.span.start, Position::new(1, 0));
}

#[test]
fn test_load_order_does_not_matter() {
    let registry = registry_with(&[("/g/Main.g4", MAIN)]);
    let diagnostics = registry.diagnostics("/g/Main.g4");
    assert!(kinds(&diagnostics).contains(&DiagnosticKind::UnresolvedImport));
    assert_eq!(count_kind(&diagnostics, DiagnosticKind::UnresolvedReference), 1);

    registry.load("/g/Base.g4", BASE);
    assert!(registry.diagnostics("/g/Main.g4").is_empty());
    assert_eq!(registry.file("/g/Main.g4").unwrap().resolution(), 1);
}

#[test]
fn test_removing_exported_rule_breaks_importer() {
    let registry = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]);
    registry.take_changed();

    let now = Instant::now();
    registry.edit("/g/Base.g4", "grammar Base;\nbegin : ID ;\nID : [a-z]+ ;\n", now);
    let report = registry.flush_due(now + DEBOUNCE);
    assert_eq!(report.recomputed, vec![PathBuf::from("/g/Base.g4")]);
    assert_eq!(report.re_resolved, vec![PathBuf::from("/g/Main.g4")]);

    let diagnostics = registry.diagnostics("/g/Main.g4");
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedReference]);
    assert!(diagnostics[0].message.contains("'start'"));
    assert_eq!(registry.take_changed(), vec![PathBuf::from("/g/Main.g4")]);
}

#[test]
fn test_edit_keeping_exports_does_not_re_resolve_importers() {
    let registry = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]);
    let before = registry.file("/g/Main.g4").unwrap().resolution();

    let now = Instant::now();
    registry.edit("/g/Base.g4", format!("{BASE}// trailing note\n"), now);
    let report = registry.flush_all();
    assert!(report.re_resolved.is_empty());
    assert_eq!(registry.file("/g/Main.g4").unwrap().resolution(), before);
}

#[test]
fn test_import_cycle_is_tolerated() {
    let a = "grammar A;\nimport B;\na : b | 'a' ;\n";
    let b = "grammar B;\nimport A;\nb : 'b' ;\n";
    let registry = registry_with(&[("/g/A.g4", a), ("/g/B.g4", b)]);

    for path in ["/g/A.g4", "/g/B.g4"] {
        let diagnostics = registry.diagnostics(path);
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::CyclicImport], "{path}");
        assert_eq!(diagnostics[0].severity, Severity::Info);
        assert!(!registry.file(path).unwrap().table().is_empty());
    }
    assert!(registry.diagnostics("/g/A.g4")[0].message.contains("A -> B -> A"));
}

#[test]
fn test_token_vocab_exposes_tokens_only() {
    let vocab = "grammar V;\nhelper : ID ;\nID : [a-z]+ ;\n";
    let parser = "parser grammar P;\noptions { tokenVocab = V; }\nr : ID helper ;\n";
    let registry = registry_with(&[("/g/V.g4", vocab), ("/g/P.g4", parser)]);

    let diagnostics = registry.diagnostics("/g/P.g4");
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::UnresolvedReference]);
    assert!(diagnostics[0].message.contains("'helper'"));
}

#[test]
fn test_ambiguous_import_uses_precedence() {
    let x = "grammar X;\nshared : 'x' ;\n";
    let y = "grammar Y;\nshared : 'y' ;\n";
    let main = "grammar M;\nimport X, Y;\nr : shared ;\n";
    let first = registry_with(&[("/g/X.g4", x), ("/g/Y.g4", y), ("/g/M.g4", main)]);
    let last = GrammarRegistry::with_config(
        RegistryConfig::default().with_import_precedence(ImportPrecedence::LastImportWins),
    );
    for (path, text) in [("/g/X.g4", x), ("/g/Y.g4", y), ("/g/M.g4", main)] {
        last.load(path, text);
    }

    for (registry, winner) in [(&first, "/g/X.g4"), (&last, "/g/Y.g4")] {
        let diagnostics = registry.diagnostics("/g/M.g4");
        assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::AmbiguousReference]);
        assert_eq!(diagnostics[0].related.len(), 2);

        let file = registry.file("/g/M.g4").unwrap();
        let reference = file.references().iter().find(|r| r.name == "shared").unwrap();
        assert!(reference.resolution.is_ambiguous());
        let definition = reference.resolution.definition().unwrap();
        assert_eq!(registry.file_id(winner), Some(definition.file));
    }
}

#[test]
fn test_literal_from_two_imported_lexers_is_ambiguous() {
    let ops = "lexer grammar Ops;\nPLUS : '+' ;\n";
    let more = "lexer grammar More;\nADD : '+' ;\nID : [a-z]+ ;\n";
    let sum = "parser grammar Sum;\nimport Ops, More;\nsum : ID '+' ID ;\n";
    let registry = registry_with(&[("/g/Ops.g4", ops), ("/g/More.g4", more), ("/g/Sum.g4", sum)]);

    let diagnostics = registry.diagnostics("/g/Sum.g4");
    assert_eq!(kinds(&diagnostics), vec![DiagnosticKind::AmbiguousReference]);
    assert!(diagnostics[0].message.contains("'+'"));

    let file = registry.file("/g/Sum.g4").unwrap();
    let plus = file.references().iter().find(|r| r.name == "'+'").unwrap();
    let definition = plus.resolution.definition().unwrap();
    assert_eq!(definition.name, "PLUS");
    assert_eq!(registry.file_id("/g/Ops.g4"), Some(definition.file));
}

#[test]
fn test_unresolved_import_can_be_silenced() {
    let registry = GrammarRegistry::with_config(RegistryConfig::default().with_unresolved_imports(false));
    registry.load("/g/M.g4", "grammar M;\nimport Missing;\nr : 'x' ;\n");
    assert!(registry.diagnostics("/g/M.g4").is_empty());

    let file = registry.file("/g/M.g4").unwrap();
    let import = file.references().iter().find(|r| r.name == "Missing").unwrap();
    assert_eq!(import.resolution, Resolution::Unresolved);
}

// ============================================================================
// CLOSE
// ============================================================================

#[test]
fn test_close_restores_unresolved_diagnostics() {
    let registry = registry_with(&[("/g/Base.g4", BASE), ("/g/Main.g4", MAIN)]);
    assert!(registry.diagnostics("/g/Main.g4").is_empty());

    assert!(registry.close("/g/Base.g4"));
    assert!(!registry.is_loaded("/g/Base.g4"));
    assert!(registry.diagnostics("/g/Base.g4").is_empty());

    let diagnostics = registry.diagnostics("/g/Main.g4");
    assert_eq!(count_kind(&diagnostics, DiagnosticKind::UnresolvedImport), 1);
    assert_eq!(count_kind(&diagnostics, DiagnosticKind::UnresolvedReference), 1);
    assert!(!registry.close("/g/Base.g4"));
}

// ============================================================================
// DEBOUNCE AND SUPERSESSION
// ============================================================================

#[test]
fn test_rapid_edits_coalesce_into_one_recompute() {
    let registry = registry_with(&[("/g/G.g4", "grammar G;\nr : 'x' ;\n")]);
    let recomputes = registry.stats().recomputes;

    let start = Instant::now();
    for (i, rule) in ["a", "ab", "abc"].iter().enumerate() {
        let at = start + Duration::from_millis(100 * i as u64);
        registry.edit("/g/G.g4", format!("grammar G;\n{rule} : 'x' ;\n"), at);
    }
    assert_eq!(registry.edit_phase("/g/G.g4"), Some(EditPhase::PendingEdit));
    assert!(registry.flush_due(start + DEBOUNCE).recomputed.is_empty());

    let report = registry.flush_due(start + Duration::from_millis(200) + DEBOUNCE);
    assert_eq!(report.recomputed.len(), 1);
    assert_eq!(registry.stats().recomputes, recomputes + 1);

    let file = registry.file("/g/G.g4").unwrap();
    assert!(file.table().rule("abc").is_some());
    assert!(file.table().rule("a").is_none());
    assert_eq!(registry.edit_phase("/g/G.g4"), Some(EditPhase::Idle));
}

#[test]
fn test_superseded_result_never_becomes_visible() {
    let registry = registry_with(&[("/g/G.g4", "grammar G;\nr : 'x' ;\n")]);
    let now = Instant::now();
    registry.edit("/g/G.g4", "grammar G;\nstale : 'x' ;\n", now);
    let batch = registry.begin_flush(Some(now + DEBOUNCE));
    assert_eq!(batch.len(), 1);

    registry.edit("/g/G.g4", "grammar G;\nfresh : 'x' ;\n", now + Duration::from_millis(10));
    let computed = batch.compute();
    let report = registry.commit(computed);
    assert_eq!(report.discarded, 1);
    assert!(report.recomputed.is_empty());
    assert!(registry.file("/g/G.g4").unwrap().table().rule("stale").is_none());

    registry.flush_due(now + Duration::from_millis(10) + DEBOUNCE);
    let file = registry.file("/g/G.g4").unwrap();
    assert!(file.table().rule("fresh").is_some());
    assert!(file.table().rule("stale").is_none());
}

#[test]
fn test_edit_of_unknown_path_loads_it() {
    let registry = GrammarRegistry::new();
    let now = Instant::now();
    registry.edit("/g/New.g4", "grammar New;\nr : 'x' ;\n", now);
    assert!(!registry.is_loaded("/g/New.g4"));

    registry.flush_due(now + DEBOUNCE);
    assert!(registry.is_loaded("/g/New.g4"));
    assert_eq!(registry.take_changed(), vec![PathBuf::from("/g/New.g4")]);
}

#[test]
fn test_close_and_reopen_discards_recompute_from_before_close() {
    let registry = registry_with(&[("/g/G.g4", "grammar G;\nr : 'x' ;\n")]);
    let now = Instant::now();
    registry.edit("/g/G.g4", "grammar G;\nstale : 'x' ;\n", now);
    let before_close = registry.begin_flush(None).compute();

    registry.close("/g/G.g4");
    registry.edit("/g/G.g4", "grammar G;\nfresh : 'x' ;\n", now);
    let after_reopen = registry.begin_flush(None).compute();

    assert_eq!(registry.commit(before_close).discarded, 1);
    assert_eq!(registry.commit(after_reopen).discarded, 0);
    let file = registry.file("/g/G.g4").unwrap();
    assert_eq!(file.text(), "grammar G;\nfresh : 'x' ;\n");
    assert_eq!(registry.stats().discarded, 1);
}

#[test]
fn test_unterminated_rule_keeps_partial_table() {
    let registry = registry_with(&[("/g/G.g4", "grammar G;\nr : 'x' ;\n")]);
    let now = Instant::now();
    registry.edit("/g/G.g4", "grammar G;\nr : 'x' ;\ns : r\n", now);
    registry.flush_all();

    let file = registry.file("/g/G.g4").unwrap();
    assert_eq!(count_kind(file.diagnostics(), DiagnosticKind::SyntaxError), 1);
    assert!(file.table().rule("r").is_some());
    assert!(file.table().rule("s").is_some());
}

#[test]
fn test_snapshot_is_stable_while_registry_changes() {
    let registry = registry_with(&[("/g/G.g4", "grammar G;\nr : 'x' ;\n")]);
    let analysis = registry.analysis();

    registry.load("/g/G.g4", "grammar G;\nq : 'x' ;\n");
    assert!(analysis.file("/g/G.g4").unwrap().table().rule("r").is_some());
    assert!(registry.file("/g/G.g4").unwrap().table().rule("q").is_some());
}
