//! Shared fixtures and assertion helpers.

#![allow(dead_code)]

use rulesmith::hir::{Diagnostic, DiagnosticKind};
use rulesmith::{GrammarRegistry, Position};

/// Combined grammar with a direct left-recursive rule and a doc comment.
pub const EXPR: &str =
    "grammar Expr;\n\n/** An expression. */\nexpr : expr '*' expr\n     | INT\n     ;\nINT : [0-9]+ ;\n";

/// Grammar importing `Base` and using its `start` rule.
pub const MAIN: &str = "grammar Main;\nimport Base;\ntop : start EOF ;\n";

pub const BASE: &str = "grammar Base;\nstart : ID ;\nID : [a-z]+ ;\n";

/// A registry with every `(path, text)` loaded in order.
pub fn registry_with(files: &[(&str, &str)]) -> GrammarRegistry {
    let registry = GrammarRegistry::new();
    for (path, text) in files {
        registry.load(path, *text);
    }
    registry
}

pub fn kinds(diagnostics: &[Diagnostic]) -> Vec<DiagnosticKind> {
    diagnostics.iter().map(|d| d.kind).collect()
}

pub fn count_kind(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}

/// Position of the `nth` occurrence of `needle`, plus `shift` columns.
pub fn position_of(text: &str, needle: &str, nth: usize, shift: u32) -> Position {
    let offset = text
        .match_indices(needle)
        .nth(nth)
        .map(|(offset, _)| offset)
        .unwrap_or_else(|| panic!("'{needle}' occurs fewer than {} times", nth + 1));
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = text[line_start..offset].chars().count() as u32;
    Position::new(line, column + shift)
}

/// Assert there are no error-level diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == rulesmith::Severity::Error)
        .collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, got {} error(s):\n{}",
        errors.len(),
        errors
            .iter()
            .map(|e| format!("  Line {}: {}", e.span.start.line + 1, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
