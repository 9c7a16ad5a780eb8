//! Go-to-definition, and the "what is under the cursor" lookup shared by the
//! position-based queries.

use std::path::{Path, PathBuf};

use smol_str::SmolStr;

use super::QueryError;
use super::text_utils::word_range_at;
use crate::base::{FileId, LineCol, Position, Span, TextRange, TextSize};
use crate::hir::{Reference, Symbol, SymbolKind};
use crate::parser::{AstNode, SyntaxKind};
use crate::registry::{Snapshot, SourceFile};

/// A target location for go-to-definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GotoTarget {
    pub file: FileId,
    /// Path of the declaring file
    pub path: PathBuf,
    /// Range of the declared name
    pub range: TextRange,
    pub span: Span,
    pub kind: SymbolKind,
    pub name: SmolStr,
}

impl GotoTarget {
    pub(crate) fn new(symbol: &Symbol, snapshot: &Snapshot) -> Self {
        Self {
            file: symbol.file,
            path: snapshot
                .file(symbol.file)
                .map(|f| f.path().to_path_buf())
                .unwrap_or_default(),
            range: symbol.range,
            span: symbol.span,
            kind: symbol.kind,
            name: symbol.name.clone(),
        }
    }
}

/// What the cursor is on.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Target<'a> {
    /// The name of a declaration
    Declaration(&'a Symbol),
    Reference(&'a Reference),
    /// An identifier inside action code that names a symbol of the file,
    /// e.g. `ID` in `{$ID.text}`
    Word(&'a Symbol, TextRange),
}

impl<'a> Target<'a> {
    /// The declaration the target stands for, if known.
    pub(crate) fn symbol(&self) -> Option<&'a Symbol> {
        match self {
            Target::Declaration(symbol) | Target::Word(symbol, _) => Some(symbol),
            Target::Reference(reference) => reference.resolution.definition(),
        }
    }

    pub(crate) fn range(&self) -> TextRange {
        match self {
            Target::Declaration(symbol) => symbol.range,
            Target::Reference(reference) => reference.range,
            Target::Word(_, range) => *range,
        }
    }
}

/// Convert an editor position to a byte offset in `file`.
pub(crate) fn offset_at(file: &SourceFile, position: Position) -> Result<TextSize, QueryError> {
    file.line_index()
        .offset(LineCol {
            line: position.line,
            col: position.column,
        })
        .ok_or_else(|| {
            QueryError::InvalidArgument(format!(
                "position {} is outside {}",
                position,
                file.path().display()
            ))
        })
}

/// Find the declaration or reference at `offset`.
///
/// A range that strictly contains the offset wins over one that merely ends
/// there, and references win over declarations, so that `X` in `import X;`
/// is the imported grammar rather than the import entry.
pub(crate) fn target_at(file: &SourceFile, offset: TextSize) -> Option<Target<'_>> {
    let passes: [fn(TextRange, TextSize) -> bool; 2] = [
        |range, offset| range.contains(offset),
        |range, offset| range.contains_inclusive(offset),
    ];

    for hit in passes {
        if let Some(reference) = file.references().iter().find(|r| hit(r.range, offset)) {
            return Some(Target::Reference(reference));
        }
        if let Some(symbol) = file.symbols().iter().find(|s| hit(s.range, offset)) {
            return Some(Target::Declaration(symbol));
        }
    }
    word_in_action(file, offset)
}

fn word_in_action(file: &SourceFile, offset: TextSize) -> Option<Target<'_>> {
    let root = file.syntax();
    let token = root.syntax().token_at_offset(offset).right_biased()?;
    if token.kind() != SyntaxKind::ACTION {
        return None;
    }
    let range = word_range_at(file.text(), offset)?;
    let word = &file.text()[range];
    let symbol = file.table().lookup(word).next()?;
    Some(Target::Word(symbol, range))
}

/// Find the definition of the name at `position`.
///
/// On a reference this is its first resolution target; on a declaration it
/// is the declaration itself. Unresolved and built-in references have none.
pub fn goto_definition(
    snapshot: &Snapshot,
    path: &Path,
    position: Position,
) -> Result<Option<GotoTarget>, QueryError> {
    let Some(file) = snapshot.file_by_path(path) else {
        return Ok(None);
    };
    let offset = offset_at(file, position)?;
    Ok(target_at(file, offset)
        .and_then(|target| target.symbol())
        .map(|symbol| GotoTarget::new(symbol, snapshot)))
}
