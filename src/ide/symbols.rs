//! Symbol listing for the document outline.

use std::path::Path;

use smol_str::SmolStr;

use crate::base::{FileId, Span, TextRange};
use crate::hir::{Symbol, SymbolKind};
use crate::registry::Snapshot;

/// A symbol for the document outline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub file: FileId,
    /// Range of the name
    pub range: TextRange,
    pub span: Span,
    /// Range of the whole declaration
    pub decl_range: TextRange,
    /// Enclosing lexer mode, for grouping lexer rules
    pub container_name: Option<SmolStr>,
    /// One-line signature, e.g. `fragment DIGIT`
    pub detail: String,
}

impl SymbolInfo {
    pub fn from_symbol(symbol: &Symbol) -> Self {
        Self {
            name: symbol.name.clone(),
            kind: symbol.kind,
            file: symbol.file,
            range: symbol.range,
            span: symbol.span,
            decl_range: symbol.decl_range,
            container_name: symbol.mode.clone(),
            detail: symbol.signature(),
        }
    }
}

/// All symbols declared in a file, in declaration order.
///
/// Duplicate declarations are listed every time they occur. A file that is
/// not loaded has no symbols.
pub fn document_symbols(snapshot: &Snapshot, path: &Path) -> Vec<SymbolInfo> {
    snapshot
        .file_by_path(path)
        .map(|file| file.symbols().iter().map(SymbolInfo::from_symbol).collect())
        .unwrap_or_default()
}
