//! Immutable per-file analysis results and the committed snapshot.
//!
//! A [`SourceFile`] is never mutated once built. A reparse produces a new one
//! with a higher `version`; a re-resolution (something in the import closure
//! changed) produces a new one with the same `version` and a higher
//! `resolution`. Queries hold an `Arc<Snapshot>` and so always see one
//! consistent version of every file.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use super::graph::ImportClosure;
use crate::base::{FileId, LineIndex};
use crate::hir::{
    Diagnostic, ImportedTable, Reference, Resolver, Symbol, SymbolTable, aggregate, check_grammar,
    extract_symbols,
};
use crate::parser::{self, Parse};

/// Analysis results of one loaded file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: FileId,
    path: Arc<Path>,
    text: Arc<str>,
    version: u64,
    resolution: u64,
    resolved: bool,
    parse: Parse,
    line_index: Arc<LineIndex>,
    table: Arc<SymbolTable>,
    /// Syntax, declaration and grammar-check diagnostics; these only change
    /// on reparse
    local_diagnostics: Arc<[Diagnostic]>,
    references: Arc<[Reference]>,
    diagnostics: Arc<[Diagnostic]>,
    closure: Arc<ImportClosure>,
}

/// Everything resolution needs besides the file itself.
pub(crate) struct ResolveContext {
    pub closure: Arc<ImportClosure>,
    pub tables: Vec<ImportedTable>,
    pub grammars: FxHashMap<SmolStr, Symbol>,
    pub cycle_diagnostics: Vec<Diagnostic>,
    pub report_unresolved_imports: bool,
}

impl SourceFile {
    /// Parse `text`, build its symbol table and run the per-file checks.
    ///
    /// The result has no references yet; see [`SourceFile::resolve`].
    /// Returns `None` if `cancel` fires first.
    pub(crate) fn analyze(
        id: FileId,
        path: Arc<Path>,
        text: Arc<str>,
        version: u64,
        cancel: Option<&CancellationToken>,
    ) -> Option<SourceFile> {
        let parse = match cancel {
            Some(token) => parser::parse_cancellable(&text, token)?,
            None => parser::parse(&text),
        };
        let line_index = LineIndex::new(&text);
        let root = parse.source_file();
        let extraction = extract_symbols(id, &root, &line_index);
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return None;
        }

        let stem = path.file_stem().and_then(|s| s.to_str());
        let checks = check_grammar(id, &root, &extraction.table, &line_index, stem);
        let syntax: Vec<Diagnostic> = parse
            .errors
            .iter()
            .map(|e| Diagnostic::from_syntax_error(id, e, &line_index))
            .collect();
        let local: Arc<[Diagnostic]> = aggregate([syntax, extraction.diagnostics, checks]).into();

        Some(SourceFile {
            id,
            path,
            text,
            version,
            resolution: 0,
            resolved: false,
            parse,
            line_index: Arc::new(line_index),
            table: Arc::new(extraction.table),
            diagnostics: local.clone(),
            local_diagnostics: local,
            references: Arc::from(Vec::new()),
            closure: Arc::default(),
        })
    }

    /// Resolve references against `ctx`, keeping the parse.
    pub(crate) fn resolve(&self, ctx: ResolveContext) -> SourceFile {
        let root = self.parse.source_file();
        let output = Resolver::new(self.id, &self.table, &self.line_index)
            .with_closure(&ctx.tables)
            .with_grammars(&ctx.grammars)
            .with_unresolved_imports(ctx.report_unresolved_imports)
            .resolve(&root);
        let diagnostics = aggregate([
            self.local_diagnostics.to_vec(),
            output.diagnostics,
            ctx.cycle_diagnostics,
        ]);

        SourceFile {
            resolution: if self.resolved { self.resolution + 1 } else { 0 },
            resolved: true,
            references: output.references.into(),
            diagnostics: diagnostics.into(),
            closure: ctx.closure,
            ..self.clone()
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse version; bumped on every reparse.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of re-resolutions since the last reparse.
    pub fn resolution(&self) -> u64 {
        self.resolution
    }

    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    /// Typed root of the file's tree.
    pub fn syntax(&self) -> parser::SourceFile {
        self.parse.source_file()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }

    pub fn symbols(&self) -> &[Symbol] {
        self.table.symbols()
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The import closure this file was last resolved against.
    pub fn closure(&self) -> &ImportClosure {
        &self.closure
    }

    /// File name without extension.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// All committed files at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: FxHashMap<FileId, Arc<SourceFile>>,
    by_path: FxHashMap<Arc<Path>, FileId>,
}

impl Snapshot {
    pub fn file(&self, id: FileId) -> Option<&Arc<SourceFile>> {
        self.files.get(&id)
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }

    pub fn file_by_path(&self, path: &Path) -> Option<&Arc<SourceFile>> {
        self.file_id(path).and_then(|id| self.files.get(&id))
    }

    /// Files ordered by id, i.e. first-load order.
    pub fn files(&self) -> Vec<&Arc<SourceFile>> {
        let mut files: Vec<_> = self.files.values().collect();
        files.sort_by_key(|f| f.id);
        files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub(crate) fn insert(&mut self, file: Arc<SourceFile>) -> Option<Arc<SourceFile>> {
        self.by_path.insert(file.path.clone(), file.id);
        self.files.insert(file.id, file)
    }

    pub(crate) fn remove(&mut self, id: FileId) -> Option<Arc<SourceFile>> {
        let removed = self.files.remove(&id)?;
        self.by_path.remove(&removed.path);
        Some(removed)
    }
}
