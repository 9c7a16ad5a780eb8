//! # rulesmith-base
//!
//! Incremental analysis core for ANTLR-style grammar files: parsing, symbol
//! tables, cross-file reference resolution, diagnostics and editor queries.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → Editor queries (hover, goto-def, symbols, diagrams)
//!   ↓
//! registry  → Loaded files, debounced edits, import graph, snapshots
//!   ↓
//! hir       → Symbol tables, resolution, grammar checks, diagnostics
//!   ↓
//! parser    → Logos lexer, recursive-descent parser, typed AST
//!   ↓
//! base      → Primitives (FileId, TextRange, LineIndex)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → hir → registry → ide)
// ============================================================================

/// Foundation types: FileId, TextRange, line/column conversion
pub mod base;

/// Parser: Logos lexer, recursive-descent parser, typed AST
pub mod parser;

/// High-level IR: symbols, references, checks and diagnostics
pub mod hir;

/// Grammar registry: the owned store of loaded files
pub mod registry;

/// IDE features: hover, goto-definition, references, diagrams
pub mod ide;

// Re-export foundation types
pub use base::{FileId, LineCol, LineIndex, Position, Span, TextRange, TextSize};

// Re-export the main entry points
pub use hir::{Diagnostic, DiagnosticKind, Severity};
pub use ide::{Analysis, QueryError};
pub use registry::{GrammarRegistry, ImportPrecedence, RegistryConfig};
