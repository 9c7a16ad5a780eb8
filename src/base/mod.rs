//! Foundation types for the rulesmith toolchain.
//!
//! This module provides fundamental types used throughout the analysis core:
//! - [`FileId`] - Stable file identifiers handed out by the registry
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Position`], [`Span`] - Line/column positions for symbols and diagnostics
//!
//! This module has NO dependencies on other rulesmith modules.

mod file_id;
mod position;
mod span;

pub use file_id::{FileId, FileSet};
pub use position::{Position, Span};
pub use span::{LineCol, LineIndex, TextRange, TextSize};

// Re-export text-size types for convenience
pub use text_size;
