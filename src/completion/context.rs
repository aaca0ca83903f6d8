//! Cursor context classification for template documents.
//!
//! Templates are never tokenized.  Instead, a single backward scan from
//! the cursor looks for the nearest character that opens or closes a
//! construct and classifies the cursor by it:
//!
//! | first construct found         | classification                    |
//! |-------------------------------|-----------------------------------|
//! | `}` or `>`                    | nothing (construct already closed)|
//! | `{{`                          | double-brace bound expression     |
//! | `{`                           | single-brace bound expression     |
//! | `="`                          | attribute value                   |
//! | `)="`                         | event binding                     |
//! | `<` (cursor after a space)    | opening tag interior              |
//!
//! Quoted attribute values that are already closed are skipped as a
//! whole, so `>` or `{` inside them do not end the scan.
//!
//! The functions here are pure and never fail: every offset yields some
//! classification.

use tower_lsp::lsp_types::Position;

use crate::types::{CursorContext, RegionKind};
use crate::util::{floor_char_boundary, position_to_byte_offset};

/// Classify the cursor at byte `offset` in `text`.
///
/// Offsets past the end clamp to the end; offsets inside a multi-byte
/// character clamp to its start.
pub fn classify(text: &str, offset: usize) -> CursorContext {
    let offset = floor_char_boundary(text, offset);
    let chars: Vec<char> = text[..offset].chars().collect();
    let cursor_after_space = chars.last() == Some(&' ');

    // True while walking backward through a quoted value whose closing
    // quote has been seen but whose opening quote has not.
    let mut in_quotes = false;

    let mut i = chars.len();
    while i > 0 {
        i -= 1;
        let ch = chars[i];
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let escaped = prev == Some('\\');

        match ch {
            '"' if !escaped => {
                if !in_quotes && prev == Some('=') {
                    let is_event = i >= 2 && chars[i - 2] == ')';
                    return attribute(is_event);
                }
                in_quotes = !in_quotes;
            }
            _ if in_quotes => {}
            '}' | '>' => return CursorContext::default(),
            '{' if !escaped => return brace(prev == Some('{')),
            '<' => return tag(&chars[i + 1..], cursor_after_space),
            _ => {}
        }
    }

    CursorContext::default()
}

/// [`classify`] for an LSP position.
pub fn classify_at(text: &str, position: Position) -> CursorContext {
    classify(text, position_to_byte_offset(text, position))
}

fn attribute(is_event: bool) -> CursorContext {
    CursorContext {
        inside_attribute: true,
        region: if is_event {
            RegionKind::Event
        } else {
            RegionKind::Attribute
        },
        ..CursorContext::default()
    }
}

fn brace(double: bool) -> CursorContext {
    CursorContext {
        inside_code: true,
        region: if double {
            RegionKind::DoubleBrace
        } else {
            RegionKind::SingleBrace
        },
        ..CursorContext::default()
    }
}

/// `after_open` is everything between the `<` and the cursor.
fn tag(after_open: &[char], cursor_after_space: bool) -> CursorContext {
    // `</name` closes a tag; nothing to offer there.
    if after_open.first() == Some(&'/') || !cursor_after_space {
        return CursorContext::default();
    }

    let name: String = after_open
        .iter()
        .take_while(|c| !c.is_whitespace() && **c != '>' && **c != '"')
        .collect();

    CursorContext {
        inside_tag: true,
        tag_name: (!name.is_empty()).then_some(name),
        ..CursorContext::default()
    }
}

/// The partial tag name being typed right after a `<`, if any.
///
/// `<Cou|` yields `Some("Cou")` and `<|` yields `Some("")`.
pub fn partial_tag_name(text: &str, offset: usize) -> Option<&str> {
    let before = &text[..floor_char_boundary(text, offset)];
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '-')
        .last()
        .map_or(before.len(), |(idx, _)| idx);
    before[..start].ends_with('<').then(|| &before[start..])
}
