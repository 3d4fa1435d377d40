//! Text buffer utilities. LSP `Position.character` is a UTF-16
//! code unit count; the core converts to and from byte offsets at this
//! single boundary so everything downstream of [`translate`] works in plain
//! byte offsets.

use lsp_types::{Position, Range};

use crate::error::{ServerError, Result};

/// Byte offset of the start of `text`'s 0-indexed line `line`, treating
/// `\r\n` as one line break.
fn line_start(text: &str, line: u32) -> Result<usize> {
    if line == 0 {
        return Ok(0);
    }
    let bytes = text.as_bytes();
    let mut seen = 0u32;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                i += 1;
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
                seen += 1;
            }
            b'\n' => {
                i += 1;
                seen += 1;
            }
            _ => i += 1,
        }
        if seen == line {
            return Ok(i);
        }
    }
    Err(ServerError::OutOfBounds { line, column: 0 })
}

fn line_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
        i += 1;
    }
    i
}

/// The offset of the `column`th UTF-16 code unit on 0-indexed `line`.
pub fn translate(text: &str, line: u32, column: u32) -> Result<usize> {
    let start = line_start(text, line)?;
    let end = line_end(text, start);
    let slice = &text[start..end];

    let mut units = 0u32;
    let mut byte_idx = start;
    for ch in slice.chars() {
        if units == column {
            return Ok(byte_idx);
        }
        units += ch.len_utf16() as u32;
        byte_idx += ch.len_utf8();
    }
    if units == column {
        return Ok(byte_idx);
    }
    Err(ServerError::OutOfBounds { line, column })
}

pub fn translate_position(text: &str, position: Position) -> Result<usize> {
    translate(text, position.line, position.character)
}

/// Inverse of [`translate`]: the (line, UTF-16 column) of a byte offset.
pub fn position_of(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let mut line = 0u32;
    let mut line_start_byte = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < offset {
        match bytes[i] {
            b'\r' => {
                i += 1;
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
                line += 1;
                line_start_byte = i;
            }
            b'\n' => {
                i += 1;
                line += 1;
                line_start_byte = i;
            }
            _ => i += 1,
        }
    }
    let column = text[line_start_byte..offset].chars().map(|c| c.len_utf16() as u32).sum();
    Position { line, character: column }
}

/// Splices `replacement` into the half-open byte interval translated from
/// `range`. Idempotent only when `replacement` equals the original slice.
pub fn apply_range_replace(buf: &str, range: Range, replacement: &str) -> Result<String> {
    let start = translate_position(buf, range.start)?;
    let end = translate_position(buf, range.end)?;
    let mut out = String::with_capacity(buf.len() - (end - start) + replacement.len());
    out.push_str(&buf[..start]);
    out.push_str(replacement);
    out.push_str(&buf[end..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_round_trips_with_position_of() {
        let text = "line zero\nline one\nline two";
        for (line, column) in [(0, 0), (0, 4), (1, 0), (1, 9), (2, 8)] {
            let offset = translate(text, line, column).unwrap();
            let pos = position_of(text, offset);
            assert_eq!((pos.line, pos.character), (line, column));
        }
    }

    #[test]
    fn translate_treats_crlf_as_one_break() {
        let text = "a\r\nb";
        assert_eq!(translate(text, 1, 0).unwrap(), 3);
    }

    #[test]
    fn translate_rejects_out_of_bounds() {
        let text = "short";
        assert!(translate(text, 5, 0).is_err());
        assert!(translate(text, 0, 99).is_err());
    }

    #[test]
    fn apply_range_replace_with_identical_slice_is_idempotent() {
        let text = "hello world";
        let range = Range {
            start: Position { line: 0, character: 0 },
            end: Position { line: 0, character: 5 },
        };
        let replaced = apply_range_replace(text, range, "hello").unwrap();
        assert_eq!(replaced, text);
    }

    #[test]
    fn apply_range_replace_splices_the_interval() {
        let text = "the quick fox";
        let range = Range {
            start: Position { line: 0, character: 4 },
            end: Position { line: 0, character: 9 },
        };
        let replaced = apply_range_replace(text, range, "slow").unwrap();
        assert_eq!(replaced, "the slow fox");
    }

    #[test]
    fn translate_handles_utf16_surrogate_pairs() {
        // U+1F600 is one UTF-16 surrogate pair (2 code units) but 4 UTF-8 bytes.
        let text = "a\u{1F600}b";
        let offset = translate(text, 0, 3).unwrap();
        assert_eq!(&text[offset..], "b");
    }
}
