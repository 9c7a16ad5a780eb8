//! High-level IR (HIR): the semantic model of one grammar file.
//!
//! Everything here is a pure function of a parsed tree plus, for resolution,
//! the already-committed tables of the file's import closure. The registry
//! decides when to run each stage; this module never caches anything.
//!
//! ## Stages
//!
//! ```text
//! SourceFile (parser)
//!     │
//!     ▼
//! extract_symbols(file)     ← declarations + imports + header
//!     │
//!     ▼
//! Resolver::resolve(file)   ← references against own table + closure
//!     │
//!     ▼
//! check_grammar(file)       ← left recursion, rule placement, naming
//!     │
//!     ▼
//! aggregate(stages)         ← one position-ordered diagnostic list
//! ```

mod checks;
mod diagnostics;
mod resolve;
mod symbols;

pub use checks::check_grammar;
pub use diagnostics::{
    Diagnostic, DiagnosticCollector, DiagnosticKind, RelatedInfo, Severity, aggregate, codes,
};
pub use resolve::{
    ImportedTable, Reference, ReferenceKind, Resolution, ResolveOutput, Resolver, Visibility,
    is_built_in,
};
pub use symbols::{
    ExtractionResult, GrammarHeader, GrammarImport, ImportKind, Symbol, SymbolKind, SymbolTable,
    extract_symbols,
};
