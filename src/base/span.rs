//! Byte offset <-> line/column conversion.
//!
//! Trees and diagnostics carry byte ranges; editors speak lines and columns.
//! Columns count Unicode scalar values from the start of the line.

pub use text_size::{TextRange, TextSize};

use super::position::{Position, Span};

/// A 0-indexed line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// A multi-byte character inside a line, used to turn byte columns into
/// character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WideChar {
    /// Byte offset from the start of the line
    start: u32,
    /// Length in bytes
    len: u32,
}

/// Maps offsets in one text to line/column and back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Offset of the first byte of each line
    line_starts: Vec<TextSize>,
    /// Multi-byte characters, per line; empty for pure ASCII lines
    wide_chars: Vec<Vec<WideChar>>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        let mut wide_chars = vec![Vec::new()];
        let mut line_start = 0u32;

        for (offset, ch) in text.char_indices() {
            let offset = offset as u32;
            if ch == '\n' {
                line_start = offset + 1;
                line_starts.push(TextSize::new(line_start));
                wide_chars.push(Vec::new());
            } else if ch.len_utf8() > 1 {
                if let Some(line) = wide_chars.last_mut() {
                    line.push(WideChar {
                        start: offset - line_start,
                        len: ch.len_utf8() as u32,
                    });
                }
            }
        }

        Self {
            line_starts,
            wide_chars,
            len: TextSize::of(text),
        }
    }

    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    pub fn len(&self) -> TextSize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == TextSize::new(0)
    }

    /// Line/column of a byte offset; offsets past the end clamp to the end.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let byte_col = u32::from(offset - self.line_starts[line]);
        LineCol {
            line: line as u32,
            col: self.byte_col_to_char_col(line, byte_col),
        }
    }

    /// Byte offset of a line/column, `None` if the line does not exist or the
    /// column is past the end of the line.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let line = line_col.line as usize;
        let start = *self.line_starts.get(line)?;
        let end = self.line_end(line);
        let byte_col = self.char_col_to_byte_col(line, line_col.col);
        let offset = start + TextSize::new(byte_col);
        (offset <= end).then_some(offset)
    }

    pub fn position(&self, offset: TextSize) -> Position {
        let lc = self.line_col(offset);
        Position::new(lc.line, lc.col)
    }

    pub fn span(&self, range: TextRange) -> Span {
        Span::new(self.position(range.start()), self.position(range.end()))
    }

    /// Offset of the end of `line`, excluding its line terminator
    fn line_end(&self, line: usize) -> TextSize {
        match self.line_starts.get(line + 1) {
            // exclude the '\n'
            Some(&next) => next - TextSize::new(1),
            None => self.len,
        }
    }

    fn byte_col_to_char_col(&self, line: usize, byte_col: u32) -> u32 {
        let mut col = byte_col;
        for wide in &self.wide_chars[line] {
            if wide.start >= byte_col {
                break;
            }
            col -= wide.len - 1;
        }
        col
    }

    fn char_col_to_byte_col(&self, line: usize, char_col: u32) -> u32 {
        let mut col = char_col;
        for wide in &self.wide_chars[line] {
            // `wide.start` is in bytes; compare against the byte column so far
            if wide.start >= col {
                break;
            }
            col += wide.len - 1;
        }
        col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_ascii() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(TextSize::new(0)), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(TextSize::new(4)), LineCol { line: 1, col: 1 });
        assert_eq!(index.line_col(TextSize::new(6)), LineCol { line: 2, col: 0 });
        assert_eq!(index.line_col(TextSize::new(9)), LineCol { line: 3, col: 2 });
    }

    #[test]
    fn test_offset_roundtrip_and_bounds() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset(LineCol { line: 1, col: 2 }), Some(TextSize::new(5)));
        assert_eq!(index.offset(LineCol { line: 0, col: 2 }), Some(TextSize::new(2)));
        assert_eq!(index.offset(LineCol { line: 0, col: 3 }), None);
        assert_eq!(index.offset(LineCol { line: 2, col: 0 }), None);
    }

    #[test]
    fn test_wide_chars_count_as_one_column() {
        // 'é' is two bytes
        let text = "é = x;";
        let index = LineIndex::new(text);
        let x = TextSize::new(text.find('x').unwrap() as u32);
        assert_eq!(index.line_col(x), LineCol { line: 0, col: 4 });
        assert_eq!(index.offset(LineCol { line: 0, col: 4 }), Some(x));
    }

    #[test]
    fn test_span_of_range() {
        let index = LineIndex::new("grammar G;\nr : A ;");
        let span = index.span(TextRange::new(TextSize::new(11), TextSize::new(12)));
        assert_eq!(span, Span::from_coords(1, 0, 1, 1));
    }
}
