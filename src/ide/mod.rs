//! IDE features: high-level queries for an editor shell.
//!
//! This module provides the interface between the semantic model (HIR) and
//! whatever editor integration drives the registry. Each function answers one
//! editor request.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: Take a snapshot in, return owned data out
//! 2. **No editor types**: Uses our own types, converted at the shell boundary
//! 3. **Never reparse**: Everything is read from committed analysis results
//!
//! ## Usage
//!
//! The recommended way to use this module is through [`Analysis`]:
//!
//! ```ignore
//! let registry = GrammarRegistry::new();
//! registry.load("/g/Expr.g4", text);
//!
//! let analysis = registry.analysis();
//! let symbols = analysis.document_symbols("/g/Expr.g4");
//! ```

mod analysis;
mod diagram;
mod error;
mod goto;
mod hover;
mod references;
mod symbols;
pub mod text_utils;

pub use analysis::Analysis;
pub use diagram::{DiagramNode, RuleDiagram, diagram_source, rule_at};
pub use error::QueryError;
pub use goto::{GotoTarget, goto_definition};
pub use hover::{HoverResult, hover};
pub use references::{CodeLens, ReferenceLocation, code_lenses, find_references};
pub use symbols::{SymbolInfo, document_symbols};
