//! Syntax and semantic error reporting.
//!
//! Every stage of the per-file pipeline reports problems as data. The
//! aggregator at the bottom of this module merges the stages into the single
//! ordered list a file exposes.

use std::sync::Arc;

use crate::base::{FileId, LineIndex, Span, TextRange};
use crate::parser::SyntaxError;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }

    /// Ordering rank used by the aggregator: errors first.
    fn rank(self) -> u8 {
        self.to_lsp() as u8
    }
}

/// The stable category of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    SyntaxError,
    DuplicateDeclaration,
    UnresolvedReference,
    AmbiguousReference,
    CyclicImport,
    UnresolvedImport,
    LeftRecursion,
    FragmentInParserRule,
    ParserRuleInLexerRule,
    ImplicitTokenInParser,
    RuleNotAllowed,
    GrammarNameMismatch,
    EmptyGrammar,
}

impl DiagnosticKind {
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::SyntaxError => codes::SYNTAX_ERROR,
            DiagnosticKind::DuplicateDeclaration => codes::DUPLICATE_DECLARATION,
            DiagnosticKind::UnresolvedReference => codes::UNRESOLVED_REFERENCE,
            DiagnosticKind::AmbiguousReference => codes::AMBIGUOUS_REFERENCE,
            DiagnosticKind::CyclicImport => codes::CYCLIC_IMPORT,
            DiagnosticKind::UnresolvedImport => codes::UNRESOLVED_IMPORT,
            DiagnosticKind::LeftRecursion => codes::LEFT_RECURSION,
            DiagnosticKind::FragmentInParserRule => codes::FRAGMENT_IN_PARSER_RULE,
            DiagnosticKind::ParserRuleInLexerRule => codes::PARSER_RULE_IN_LEXER_RULE,
            DiagnosticKind::ImplicitTokenInParser => codes::IMPLICIT_TOKEN_IN_PARSER,
            DiagnosticKind::RuleNotAllowed => codes::RULE_NOT_ALLOWED,
            DiagnosticKind::GrammarNameMismatch => codes::GRAMMAR_NAME_MISMATCH,
            DiagnosticKind::EmptyGrammar => codes::EMPTY_GRAMMAR,
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::AmbiguousReference
            | DiagnosticKind::UnresolvedImport
            | DiagnosticKind::GrammarNameMismatch => Severity::Warning,
            DiagnosticKind::CyclicImport | DiagnosticKind::EmptyGrammar => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The file containing this diagnostic.
    pub file: FileId,
    /// Byte range in the file.
    pub range: TextRange,
    /// Line/column form of `range`.
    pub span: Span,
    /// Severity level.
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// The diagnostic message.
    pub message: Arc<str>,
    /// Optional related locations.
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    /// The file containing this info.
    pub file: FileId,
    pub range: TextRange,
    pub span: Span,
    /// The message.
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create a diagnostic with the kind's default severity.
    pub fn new(
        kind: DiagnosticKind,
        file: FileId,
        range: TextRange,
        span: Span,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            file,
            range,
            span,
            severity: kind.default_severity(),
            kind,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Convert a parser error.
    pub fn from_syntax_error(file: FileId, error: &SyntaxError, line_index: &LineIndex) -> Self {
        Self::new(
            DiagnosticKind::SyntaxError,
            file,
            error.range,
            line_index.span(error.range),
            error.message.as_str(),
        )
    }

    /// Override the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    /// The stable code, e.g. `G0003`.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes.
///
/// ## Code Ranges
///
/// - **G0001-G0009**: Syntax and declaration errors
/// - **G0010-G0029**: Reference and import problems
/// - **G0030-G0049**: Grammar structure checks
pub mod codes {
    /// Malformed input.
    pub const SYNTAX_ERROR: &str = "G0001";
    /// Name declared twice in the same namespace.
    pub const DUPLICATE_DECLARATION: &str = "G0002";

    /// Reference with no target.
    pub const UNRESOLVED_REFERENCE: &str = "G0010";
    /// Reference with targets in several imported grammars.
    pub const AMBIGUOUS_REFERENCE: &str = "G0011";
    /// Import cycle (tolerated).
    pub const CYCLIC_IMPORT: &str = "G0012";
    /// Imported grammar is not loaded.
    pub const UNRESOLVED_IMPORT: &str = "G0013";
    /// Parser rule references a fragment token.
    pub const FRAGMENT_IN_PARSER_RULE: &str = "G0014";
    /// Lexer rule references a parser rule.
    pub const PARSER_RULE_IN_LEXER_RULE: &str = "G0015";
    /// Literal without a defining lexer rule in a parser grammar.
    pub const IMPLICIT_TOKEN_IN_PARSER: &str = "G0016";

    /// Mutually left-recursive rules.
    pub const LEFT_RECURSION: &str = "G0030";
    /// Rule kind not allowed in this grammar type.
    pub const RULE_NOT_ALLOWED: &str = "G0031";
    /// Grammar name differs from the file name.
    pub const GRAMMAR_NAME_MISMATCH: &str = "G0032";
    /// Grammar declares no rules.
    pub const EMPTY_GRAMMAR: &str = "G0033";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during analysis of one file.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Merge the diagnostics of every pipeline stage for one file.
///
/// The result is ordered by start position, then severity (errors first).
/// Diagnostics equal on both keep the order in which they were produced.
pub fn aggregate<I>(stages: I) -> Vec<Diagnostic>
where
    I: IntoIterator<Item = Vec<Diagnostic>>,
{
    let mut all: Vec<Diagnostic> = stages.into_iter().flatten().collect();
    all.sort_by_key(|d| (d.range.start(), d.severity.rank()));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextSize;

    fn diag(kind: DiagnosticKind, start: u32, message: &str) -> Diagnostic {
        let range = TextRange::at(TextSize::new(start), TextSize::new(1));
        Diagnostic::new(kind, FileId::new(0), range, Span::default(), message)
    }

    #[test]
    fn test_default_severity() {
        assert_eq!(
            DiagnosticKind::UnresolvedReference.default_severity(),
            Severity::Error
        );
        assert_eq!(
            DiagnosticKind::AmbiguousReference.default_severity(),
            Severity::Warning
        );
        assert_eq!(DiagnosticKind::CyclicImport.default_severity(), Severity::Info);
    }

    #[test]
    fn test_diagnostic_code() {
        let d = diag(DiagnosticKind::DuplicateDeclaration, 0, "dup");
        assert_eq!(d.code(), "G0002");
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DiagnosticCollector::new();
        collector.add(diag(DiagnosticKind::SyntaxError, 0, "error 1"));
        collector.add(diag(DiagnosticKind::UnresolvedReference, 0, "error 2"));
        collector.add(diag(DiagnosticKind::UnresolvedImport, 0, "warning 1"));

        assert_eq!(collector.error_count(), 2);
        assert_eq!(collector.warning_count(), 1);
        assert!(collector.has_errors());
        assert_eq!(collector.take().len(), 3);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_severity_to_lsp() {
        assert_eq!(Severity::Error.to_lsp(), 1);
        assert_eq!(Severity::Warning.to_lsp(), 2);
        assert_eq!(Severity::Info.to_lsp(), 3);
        assert_eq!(Severity::Hint.to_lsp(), 4);
    }

    #[test]
    fn test_aggregate_orders_by_position_then_severity() {
        let merged = aggregate(vec![
            vec![diag(DiagnosticKind::EmptyGrammar, 5, "info at 5")],
            vec![
                diag(DiagnosticKind::UnresolvedReference, 9, "error at 9"),
                diag(DiagnosticKind::AmbiguousReference, 5, "warning at 5"),
            ],
            vec![
                diag(DiagnosticKind::SyntaxError, 5, "error at 5"),
                diag(DiagnosticKind::SyntaxError, 5, "second error at 5"),
                diag(DiagnosticKind::UnresolvedReference, 1, "error at 1"),
            ],
        ]);
        let messages: Vec<_> = merged.iter().map(|d| d.message.as_ref()).collect();
        assert_eq!(
            messages,
            vec![
                "error at 1",
                "error at 5",
                "second error at 5",
                "warning at 5",
                "info at 5",
                "error at 9",
            ]
        );
    }
}
