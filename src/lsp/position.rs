//! Document text utilities for request handlers
//!
//! Offset/position conversion, identifier extraction around the cursor, and
//! the backwards walk to an enclosing call used by signature help. All
//! scanning is line-local and string/comment aware.

use tower_lsp::lsp_types::Position;

use crate::grammar::matcher::is_symbol_char;

/// An identifier found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the first character in the source
    pub start: usize,
    pub text: String,
}

/// Enclosing-call information for signature help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Position of the call's opening parenthesis
    pub open_paren: Position,
    /// Top-level commas seen between the cursor and the opening parenthesis
    pub commas: usize,
}

/// Convert a byte offset to a 0-based line/character position.
pub fn offset_to_position(source: &str, offset: usize) -> Position {
    let offset = offset.min(source.len());
    let mut line = 0u32;
    let mut col = 0u32;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }

    Position::new(line, col)
}

/// Convert a 0-based line/character position to a byte offset. Characters
/// past the end of a line clamp to the line end; lines past the end of the
/// document yield `None`.
pub fn position_to_offset(source: &str, position: Position) -> Option<usize> {
    let mut line = 0u32;
    let mut col = 0u32;

    for (i, c) in source.char_indices() {
        if line == position.line && col == position.character {
            return Some(i);
        }
        if c == '\n' {
            if line == position.line {
                return Some(i);
            }
            line += 1;
            col = 0;
        } else if line == position.line {
            col += 1;
        }
    }

    (line == position.line).then_some(source.len())
}

/// The text of one line, without its terminator.
pub fn line_at(source: &str, line: u32) -> &str {
    source.lines().nth(line as usize).unwrap_or("")
}

/// The identifier containing (or immediately left of) the byte offset.
pub fn word_at(source: &str, offset: usize) -> Option<Token> {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());

    let mut start = offset;
    while start > 0 && is_symbol_char(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_symbol_char(bytes[end]) {
        end += 1;
    }

    if start >= end {
        return None;
    }

    Some(Token {
        start,
        text: source.get(start..end)?.to_string(),
    })
}

/// The nearest identifier at or before the offset, searching left within the
/// offset's line only.
pub fn previous_token(source: &str, offset: usize) -> Option<Token> {
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);

    let mut probe = offset;
    loop {
        if let Some(token) = word_at(source, probe) {
            return Some(token);
        }
        if probe <= line_start {
            return None;
        }
        probe -= 1;
    }
}

/// Whether the position sits inside a double-quoted string on its line,
/// judged by counting unescaped quotes to the left.
pub fn is_in_string(line: &str, character: usize) -> bool {
    let upto = character.min(line.len());
    let prefix = line.get(..upto).unwrap_or(line);
    let quotes = prefix.matches('"').count();
    let escaped = prefix.matches("\\\"").count();
    (quotes - escaped) % 2 == 1
}

/// Whether the position is after a `//` line comment opener (that is not
/// itself inside a string).
pub fn is_in_comment(line: &str, character: usize) -> bool {
    match line.find("//") {
        Some(idx) if character > idx => !is_in_string(line, idx),
        _ => false,
    }
}

/// Walk backwards from the cursor to the opening parenthesis of the
/// enclosing call, collecting the top-level commas passed on the way.
/// Gives up after thirty lines.
pub fn call_context(source: &str, position: Position) -> Option<CallContext> {
    let lines: Vec<&str> = source.lines().collect();
    let mut paren_balance = 0i32;
    let mut bracket_balance = 0i32;
    let mut commas = 0usize;

    let first_line = position.line.saturating_sub(30);
    for line_number in (first_line..=position.line).rev() {
        let line = lines.get(line_number as usize)?;
        let upto = if line_number == position.line {
            (position.character as usize).min(line.len())
        } else {
            line.len()
        };
        let scanned = line.get(..upto).unwrap_or(line);

        for (idx, ch) in scanned.char_indices().rev() {
            match ch {
                '{' => bracket_balance += 1,
                '}' => bracket_balance -= 1,
                '(' => {
                    paren_balance -= 1;
                    if paren_balance < 0 {
                        return Some(CallContext {
                            open_paren: Position::new(line_number, idx as u32),
                            commas,
                        });
                    }
                }
                ')' => paren_balance += 1,
                ',' => {
                    if paren_balance == 0 && bracket_balance == 0 && !is_in_string(line, idx) {
                        commas += 1;
                    }
                }
                _ => {}
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "new a = 1;\nSetValue(first, second);\n";

    #[test]
    fn test_offset_position_round_trip() {
        let pos = offset_to_position(SOURCE, 11);
        assert_eq!(pos, Position::new(1, 0));
        assert_eq!(position_to_offset(SOURCE, pos), Some(11));

        // character past line end clamps to the newline
        assert_eq!(position_to_offset(SOURCE, Position::new(0, 99)), Some(10));
        assert_eq!(position_to_offset(SOURCE, Position::new(9, 0)), None);
    }

    #[test]
    fn test_word_at_cursor() {
        // inside "SetValue"
        let token = word_at(SOURCE, 13).unwrap();
        assert_eq!(token.text, "SetValue");
        assert_eq!(token.start, 11);

        // on punctuation
        assert!(word_at(SOURCE, 10).is_none());
    }

    #[test]
    fn test_previous_token_walks_left() {
        // cursor right after "SetValue("
        let offset = SOURCE.find('(').unwrap() + 1;
        let token = previous_token(SOURCE, offset).unwrap();
        assert_eq!(token.text, "SetValue");

        // does not cross line boundaries
        assert!(previous_token("(\nx", 1).is_none());
    }

    #[test]
    fn test_string_and_comment_detection() {
        let line = r#"print("hi there"); // done"#;
        let quote = line.find('"').unwrap();
        assert!(is_in_string(line, quote + 2));
        assert!(!is_in_string(line, quote));

        let comment = line.find("//").unwrap();
        assert!(!is_in_comment(line, comment));
        assert!(is_in_comment(line, comment + 3));

        // a `//` inside a string does not open a comment
        let tricky = r#"print("// not a comment")"#;
        assert!(!is_in_comment(tricky, 20));
    }

    #[test]
    fn test_call_context_commas() {
        let pos = Position::new(1, 21); // inside "second"
        let call = call_context(SOURCE, pos).unwrap();
        assert_eq!(call.open_paren, Position::new(1, 8));
        assert_eq!(call.commas, 1);
    }

    #[test]
    fn test_call_context_ignores_nested_calls() {
        let source = "Outer(Inner(a, b), c";
        let call = call_context(source, Position::new(0, 20)).unwrap();
        assert_eq!(call.open_paren, Position::new(0, 5));
        assert_eq!(call.commas, 1);
    }

    #[test]
    fn test_call_context_none_outside_call() {
        assert!(call_context("new x = 1;", Position::new(0, 5)).is_none());
    }
}
