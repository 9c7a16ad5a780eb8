//! A consistent read-only view for IDE queries.
//!
//! The [`GrammarRegistry`](crate::registry::GrammarRegistry) owns all mutable
//! state and hands out `Analysis` snapshots. A snapshot never changes: edits
//! committed after it was taken are only visible through a new one.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = GrammarRegistry::new();
//! registry.load("/g/Expr.g4", text);
//!
//! let analysis = registry.analysis();
//! let hover = analysis.hover("/g/Expr.g4", Position::new(3, 4))?;
//! let symbols = analysis.document_symbols("/g/Expr.g4");
//! ```

use std::path::Path;
use std::sync::Arc;

use smol_str::SmolStr;

use super::{
    CodeLens, GotoTarget, HoverResult, QueryError, ReferenceLocation, RuleDiagram, SymbolInfo,
};
use crate::base::{FileId, Position};
use crate::hir::Diagnostic;
use crate::registry::{Snapshot, SourceFile};

/// An immutable snapshot of the analysis state.
///
/// All IDE queries go through this struct so that the results of several
/// queries agree with each other. Cloning is cheap.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    snapshot: Arc<Snapshot>,
}

impl Analysis {
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }

    // ==================== Position-based features ====================

    /// Get hover information at a position.
    pub fn hover(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Result<Option<HoverResult>, QueryError> {
        super::hover(&self.snapshot, path.as_ref(), position)
    }

    /// Go to definition at a position.
    pub fn goto_definition(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Result<Option<GotoTarget>, QueryError> {
        super::goto_definition(&self.snapshot, path.as_ref(), position)
    }

    /// Find the declaration and all uses of the symbol at a position.
    pub fn find_references(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Result<Vec<ReferenceLocation>, QueryError> {
        super::find_references(&self.snapshot, path.as_ref(), position)
    }

    /// The rule enclosing a position.
    pub fn rule_at(
        &self,
        path: impl AsRef<Path>,
        position: Position,
    ) -> Result<Option<SmolStr>, QueryError> {
        super::rule_at(&self.snapshot, path.as_ref(), position)
    }

    // ==================== File-based features ====================

    /// Get all symbols in a document.
    pub fn document_symbols(&self, path: impl AsRef<Path>) -> Vec<SymbolInfo> {
        super::document_symbols(&self.snapshot, path.as_ref())
    }

    /// Diagram source of a rule.
    pub fn diagram_source(
        &self,
        path: impl AsRef<Path>,
        rule_name: &str,
    ) -> Result<Option<RuleDiagram>, QueryError> {
        super::diagram_source(&self.snapshot, path.as_ref(), rule_name)
    }

    /// Reference counts for every rule of a file.
    pub fn code_lenses(&self, path: impl AsRef<Path>) -> Vec<CodeLens> {
        super::code_lenses(&self.snapshot, path.as_ref())
    }

    /// Diagnostics of a file, ordered by position.
    pub fn diagnostics(&self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        self.file(path)
            .map(|file| file.diagnostics().to_vec())
            .unwrap_or_default()
    }

    // ==================== Accessors ====================

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<&Arc<SourceFile>> {
        self.snapshot.file_by_path(path.as_ref())
    }

    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.snapshot.file_id(path.as_ref())
    }

    pub fn file_path(&self, file: FileId) -> Option<&Path> {
        self.snapshot.file(file).map(|f| f.path())
    }
}
