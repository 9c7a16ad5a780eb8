//! Text helpers for cursor positions and identifiers.

use crate::base::{TextRange, TextSize};

/// Check if a character is part of an identifier.
///
/// Uses Unicode Standard Annex #31 rules for identifier characters.
#[inline]
pub fn is_word_character(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Whether `name` is a single identifier, as rule names are.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || unicode_ident::is_xid_start(first) => {
            chars.all(is_word_character)
        }
        _ => false,
    }
}

/// Range of the identifier touching `offset` in `text`.
///
/// A cursor placed right after the last character still counts as being on
/// the word. Returns `None` if no word character is adjacent.
pub fn word_range_at(text: &str, offset: TextSize) -> Option<TextRange> {
    let offset = usize::from(offset);
    if offset > text.len() || !text.is_char_boundary(offset) {
        return None;
    }

    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_character(*c))
        .last()
        .map_or(offset, |(idx, _)| idx);
    let end = offset
        + text[offset..]
            .chars()
            .take_while(|c| is_word_character(*c))
            .map(char::len_utf8)
            .sum::<usize>();

    (start < end).then(|| TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32)))
}
