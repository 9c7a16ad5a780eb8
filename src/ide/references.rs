//! Find references and per-rule reference counts.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::QueryError;
use super::goto::{offset_at, target_at};
use crate::base::{FileId, Position, Span, TextRange};
use crate::hir::Symbol;
use crate::registry::Snapshot;

/// A place a symbol is declared or used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceLocation {
    pub file: FileId,
    pub path: PathBuf,
    pub range: TextRange,
    pub span: Span,
    /// Whether this is the declaration (vs a use).
    pub is_definition: bool,
}

/// Reference count shown above a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeLens {
    pub name: SmolStr,
    pub range: TextRange,
    pub span: Span,
    pub reference_count: usize,
}

impl CodeLens {
    pub fn title(&self) -> String {
        match self.reference_count {
            1 => "1 reference".to_string(),
            n => format!("{n} references"),
        }
    }
}

/// Identity of a declaration across the snapshot.
type SymbolKey = (FileId, TextRange);

fn key(symbol: &Symbol) -> SymbolKey {
    (symbol.file, symbol.range)
}

/// Find the declaration and every use of the symbol at `position`, across
/// all loaded files.
///
/// Uses are references whose definition target is that declaration. The
/// declaration comes first, then uses ordered by file and position.
pub fn find_references(
    snapshot: &Snapshot,
    path: &Path,
    position: Position,
) -> Result<Vec<ReferenceLocation>, QueryError> {
    let Some(file) = snapshot.file_by_path(path) else {
        return Ok(Vec::new());
    };
    let offset = offset_at(file, position)?;
    let Some(symbol) = target_at(file, offset).and_then(|target| target.symbol()) else {
        return Ok(Vec::new());
    };
    let wanted = key(symbol);

    let mut locations = vec![ReferenceLocation {
        file: symbol.file,
        path: snapshot
            .file(symbol.file)
            .map(|f| f.path().to_path_buf())
            .unwrap_or_default(),
        range: symbol.range,
        span: symbol.span,
        is_definition: true,
    }];
    for source in snapshot.files() {
        for reference in source.references() {
            if reference.resolution.definition().map(key) == Some(wanted) {
                locations.push(ReferenceLocation {
                    file: reference.file,
                    path: source.path().to_path_buf(),
                    range: reference.range,
                    span: reference.span,
                    is_definition: false,
                });
            }
        }
    }
    Ok(locations)
}

/// One lens per rule of the file, counting uses across all loaded files.
pub fn code_lenses(snapshot: &Snapshot, path: &Path) -> Vec<CodeLens> {
    let Some(file) = snapshot.file_by_path(path) else {
        return Vec::new();
    };

    let mut counts: FxHashMap<SymbolKey, usize> = FxHashMap::default();
    for source in snapshot.files() {
        for reference in source.references() {
            if let Some(definition) = reference.resolution.definition()
                && definition.file == file.id()
            {
                *counts.entry(key(definition)).or_default() += 1;
            }
        }
    }

    file.symbols()
        .iter()
        .filter(|symbol| symbol.kind.is_rule())
        .map(|symbol| CodeLens {
            name: symbol.name.clone(),
            range: symbol.range,
            span: symbol.span,
            reference_count: counts.get(&key(symbol)).copied().unwrap_or(0),
        })
        .collect()
}
