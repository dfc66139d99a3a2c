//! Macro-expansion preview for the token under the cursor
//!
//! Scans a line tail for the first identifier that names a registered
//! substitution macro and applies that macro once, leaving the rest of the
//! line untouched. No recursive re-expansion: hover shows exactly one
//! substitution step.

use crate::grammar::matcher::{self, is_symbol_char, is_symbol_start};
use crate::grammar::symbol::Substitute;

/// Expand the first applicable macro in `text` (the tail of one line,
/// starting at the cursor token, without a trailing newline).
///
/// Operands of the `defined` preprocessor operator are skipped untouched.
/// Every macro whose name equals the identifier is tried in registration
/// order; the first successful match wins. Returns `None` when no macro
/// applied anywhere on the line.
pub fn preview_line(text: &str, substitutions: &[Substitute]) -> Option<String> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        while start < bytes.len() && !is_symbol_start(bytes[start]) {
            start += 1;
        }
        if start >= bytes.len() {
            break;
        }

        // `defined X` / `defined (X)` tests a symbol without expanding it.
        if start + 7 < bytes.len() && &bytes[start..start + 7] == b"defined" && bytes[start + 7] <= b' ' {
            start += 7;
            while start < bytes.len() && (bytes[start] <= b' ' || bytes[start] == b'(') {
                start += 1;
            }
            while start < bytes.len() && is_symbol_char(bytes[start]) {
                start += 1;
            }
            continue;
        }

        let mut end = start;
        while end < bytes.len() && is_symbol_char(bytes[end]) {
            end += 1;
        }
        let token = &text[start..end];

        for sub in substitutions.iter().filter(|s| s.matches_token(token)) {
            if let Some(m) = matcher::try_match(sub, &text[start..]) {
                let mut out = String::with_capacity(text.len());
                out.push_str(&text[..start]);
                out.push_str(&m.expansion);
                out.push_str(&text[start + m.consumed..]);
                return Some(out);
            }
        }

        start = end;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs() -> Vec<Substitute> {
        vec![
            Substitute {
                pattern: "MAX(%0,%1)".to_string(),
                match_length: 3,
                substitution: "((%0)>(%1)?(%0):(%1))".to_string(),
                detail: String::new(),
            },
            Substitute {
                pattern: "PI".to_string(),
                match_length: 2,
                substitution: "3.14159".to_string(),
                detail: String::new(),
            },
        ]
    }

    #[test]
    fn test_single_substitution_with_remainder() {
        let out = preview_line("x = MAX(a,b) + 1;", &subs()).unwrap();
        assert_eq!(out, "x = ((a)>(b)?(a):(b)) + 1;");
    }

    #[test]
    fn test_at_most_one_substitution() {
        // Only the first applicable macro expands; PI stays as written.
        let out = preview_line("MAX(a,b) + PI", &subs()).unwrap();
        assert_eq!(out, "((a)>(b)?(a):(b)) + PI");
    }

    #[test]
    fn test_defined_operand_untouched() {
        let out = preview_line("defined PI ? PI : 0", &subs()).unwrap();
        assert_eq!(out, "defined PI ? 3.14159 : 0");
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(preview_line("plain(text)", &subs()).is_none());
        assert!(preview_line("", &subs()).is_none());
    }

    #[test]
    fn test_failed_match_does_not_stop_scan() {
        // MAX without a complete argument list fails to match, but a later
        // macro on the line still expands.
        let out = preview_line("MAX + PI", &subs()).unwrap();
        assert_eq!(out, "MAX + 3.14159");
    }

    #[test]
    fn test_prefix_identifier_not_expanded() {
        assert!(preview_line("PILE", &subs()).is_none());
    }
}
