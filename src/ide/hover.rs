//! Hover information implementation.

use std::path::Path;

use super::QueryError;
use super::goto::{Target, offset_at, target_at};
use crate::base::{Position, Span, TextRange};
use crate::hir::{Reference, ReferenceKind, Resolution, Symbol};
use crate::registry::Snapshot;

/// Result of a hover request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverResult {
    /// The hover content (markdown).
    pub contents: String,
    /// Range of the hovered name.
    pub range: TextRange,
    pub span: Span,
    /// The declaration being described, if there is one.
    pub symbol: Option<Symbol>,
    /// Whether the cursor is on the declaration itself.
    pub is_definition: bool,
}

/// Get hover information for a position.
///
/// Returns `Ok(None)` if the file is not loaded or nothing is under the
/// cursor.
pub fn hover(
    snapshot: &Snapshot,
    path: &Path,
    position: Position,
) -> Result<Option<HoverResult>, QueryError> {
    let Some(file) = snapshot.file_by_path(path) else {
        return Ok(None);
    };
    let offset = offset_at(file, position)?;
    let Some(target) = target_at(file, offset) else {
        return Ok(None);
    };

    let contents = match target {
        Target::Declaration(symbol) | Target::Word(symbol, _) => build_hover_content(symbol, snapshot),
        Target::Reference(reference) => reference_content(reference, snapshot),
    };
    let range = target.range();

    Ok(Some(HoverResult {
        contents,
        range,
        span: file.line_index().span(range),
        symbol: target.symbol().cloned(),
        is_definition: matches!(target, Target::Declaration(_)),
    }))
}

fn reference_content(reference: &Reference, snapshot: &Snapshot) -> String {
    match &reference.resolution {
        Resolution::Resolved(targets) => {
            let Some(definition) = targets.first() else {
                return String::new();
            };
            let mut content = build_hover_content(definition, snapshot);
            if reference.resolution.is_ambiguous() {
                content.push_str(&format!(
                    "\n*Ambiguous: {} declarations in imported grammars*\n",
                    targets.len()
                ));
            }
            content
        }
        Resolution::BuiltIn => {
            let note = match reference.kind {
                ReferenceKind::Literal => "implicit token".to_string(),
                kind => format!("built-in {}", kind.display()),
            };
            format!("```antlr\n{}\n```\n\n*{}*\n", reference.name, note)
        }
        Resolution::Unresolved => format!(
            "```antlr\n{}\n```\n\n*Unresolved {} reference*\n",
            reference.name,
            reference.kind.display()
        ),
    }
}

/// Build markdown hover content for a symbol.
fn build_hover_content(symbol: &Symbol, snapshot: &Snapshot) -> String {
    let mut content = String::new();

    content.push_str("```antlr\n");
    content.push_str(&symbol.signature());
    content.push_str("\n```\n");

    if let Some(doc) = &symbol.doc {
        content.push_str("\n---\n\n");
        content.push_str(doc);
        content.push('\n');
    }

    content.push_str("\n*");
    content.push_str(symbol.kind.display());
    content.push('*');
    if let Some(mode) = &symbol.mode {
        content.push_str(&format!(" in mode `{mode}`"));
    }
    let file_name = snapshot
        .file(symbol.file)
        .and_then(|f| f.path().file_name().map(|n| n.to_string_lossy().into_owned()));
    if let Some(file_name) = file_name {
        content.push_str(&format!(" declared in `{file_name}`"));
    }
    content.push('\n');

    content
}
