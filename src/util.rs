/// Utility functions for the Plinth server.
///
/// Position/offset conversion between LSP `Position`s and byte offsets,
/// word extraction under the cursor, and path helpers for the
/// source/template pairing convention.
use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::{Position, Range};

/// Convert an LSP `Position` (line, character) to a byte offset in
/// `content`.
///
/// Characters are counted as Unicode scalar values, not UTF-16 code units.
/// Positions past the end of a line clamp to the line end; positions past
/// the last line clamp to the end of the content.
pub fn position_to_byte_offset(content: &str, position: Position) -> usize {
    let mut offset = 0usize;
    for (i, line) in content.split('\n').enumerate() {
        if i == position.line as usize {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let byte_col = line
                .char_indices()
                .nth(position.character as usize)
                .map(|(idx, _)| idx)
                .unwrap_or(line.len());
            return offset + byte_col;
        }
        // +1 for the newline character
        offset += line.len() + 1;
    }
    content.len()
}

/// Convert a byte offset back to an LSP `Position`.
pub fn byte_offset_to_position(content: &str, offset: usize) -> Position {
    let offset = offset.min(content.len());
    let before = &content[..floor_char_boundary(content, offset)];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let character = before[line_start..].chars().count() as u32;
    Position { line, character }
}

/// Convert a byte range to an LSP `Range`.
pub fn byte_range_to_range(content: &str, range: std::ops::Range<usize>) -> Range {
    Range {
        start: byte_offset_to_position(content, range.start),
        end: byte_offset_to_position(content, range.end),
    }
}

/// The largest char boundary that is `<= offset`.
pub fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Byte range of the identifier under (or immediately left of) `offset`.
///
/// Hyphens count as word characters so that kebab-cased template names
/// survive, but are trimmed from both ends.  A leading `$` is not part of
/// the word.
pub fn word_range_at(content: &str, offset: usize) -> Option<std::ops::Range<usize>> {
    let offset = floor_char_boundary(content, offset);
    let start = content[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(offset, |(idx, _)| idx);
    let end = content[offset..]
        .char_indices()
        .find(|(_, c)| !is_word_char(*c))
        .map_or(content.len(), |(idx, _)| offset + idx);

    let word = &content[start..end];
    let trimmed_start = start + (word.len() - word.trim_start_matches('-').len());
    let trimmed_end = end - (word.len() - word.trim_end_matches('-').len());
    (trimmed_start < trimmed_end).then_some(trimmed_start..trimmed_end)
}

/// Extract the identifier under (or immediately left of) the cursor.
pub fn extract_word_at_position(content: &str, position: Position) -> Option<String> {
    let range = word_range_at(content, position_to_byte_offset(content, position))?;
    Some(content[range].to_string())
}

/// Replace the extension of `path`.
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

/// Whether `path` carries the given extension (without the dot).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}
