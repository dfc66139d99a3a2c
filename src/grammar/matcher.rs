//! Substitution pattern matching
//!
//! Re-implements the preprocessor's text-substitution matching purely over
//! text: a macro's pattern template is matched against the input following
//! the macro name, `%0`–`%9` placeholders capture balanced chunks of input,
//! and the replacement template is expanded from the captured slots.
//!
//! The scanners operate on bytes. Pattern syntax and all delimiters are
//! ASCII; non-ASCII input bytes only ever occur inside captured chunks or
//! skipped string literals, so slice boundaries always land on character
//! boundaries.

use crate::grammar::symbol::Substitute;

/// Decode strings verbatim, without escape processing.
const RAW_MODE: u8 = 0x01;
/// Treat `\#`, `\,`, `\;`, `\)`, `\}` as literal characters.
const STRINGIZE: u8 = 0x04;

/// A successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// The substitution template with captured slots filled in
    pub expansion: String,
    /// Bytes of input consumed by the match, counted from the macro name
    pub consumed: usize,
}

/// Identifier-class character: letters, digits, `_` and `@`.
pub fn is_symbol_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'@'
}

/// Character that may start an identifier (digits excluded).
pub fn is_symbol_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'@'
}

/// Decode one literal character of `line` at `i`, honoring Pawn escape
/// sequences unless `RAW_MODE` is set. Returns the offset just past the
/// literal and the decoded character code.
///
/// Supported escapes: `\a \b \e \f \n \r \t \v`, hex `\xHH;`, decimal
/// `\DDD;`, and passthrough of `\\`, `\"`, `\'`, `\%` (plus the stringize
/// characters `# , ; ) }` when `STRINGIZE` is set). Unknown escapes decode to
/// the escaped character itself so the scan always advances.
fn literal_char(line: &[u8], i: usize, flags: u8) -> (usize, u32) {
    if i >= line.len() {
        return (i, 0);
    }
    if flags & RAW_MODE != 0 || line[i] != b'\\' {
        return (i + 1, line[i] as u32);
    }

    let mut i = i + 1;
    if i >= line.len() {
        return (i, u32::from(b'\\'));
    }

    let code = match line[i] {
        b'a' => 7,
        b'b' => 8,
        b'e' => 27,
        b'f' => 12,
        b'n' => 10,
        b'r' => 13,
        b't' => 9,
        b'v' => 11,
        b'x' => {
            let mut code: u32 = 0;
            i += 1;
            while i < line.len() && line[i].is_ascii_hexdigit() {
                let digit = (line[i] as char).to_digit(16).unwrap_or(0);
                code = code.wrapping_mul(16).wrapping_add(digit);
                i += 1;
            }
            if i < line.len() && line[i] == b';' {
                i += 1;
            }
            return (i, code);
        }
        d if d.is_ascii_digit() => {
            let mut code: u32 = 0;
            while i < line.len() && line[i].is_ascii_digit() {
                code = code.wrapping_mul(10).wrapping_add(u32::from(line[i] - b'0'));
                i += 1;
            }
            if i < line.len() && line[i] == b';' {
                i += 1;
            }
            return (i, code);
        }
        c @ (b'\\' | b'\'' | b'"' | b'%') => u32::from(c),
        c @ (b'#' | b',' | b';' | b')' | b'}') if flags & STRINGIZE != 0 => u32::from(c),
        c => u32::from(c),
    };

    (i + 1, code)
}

/// Whether `line` starts a Pawn string literal, including the packed (`!`)
/// and raw (`\`) prefixes in either order.
fn is_string_start(line: &[u8]) -> bool {
    let is_quote = |b: u8| b == b'"' || b == b'\'';

    match line.first() {
        Some(&q) if is_quote(q) => true,
        Some(&b'!') => match line.get(1) {
            Some(&q) if is_quote(q) => true,
            Some(&b'\\') => line.get(2).is_some_and(|&q| is_quote(q)),
            _ => false,
        },
        Some(&b'\\') => match line.get(1) {
            Some(&q) if is_quote(q) => true,
            Some(&b'!') => line.get(2).is_some_and(|&q| is_quote(q)),
            _ => false,
        },
        _ => false,
    }
}

/// Skip over the string literal starting at `start`, returning the index of
/// its closing quote (or the end of input if unterminated). Escaped quotes do
/// not terminate the literal; raw-mode literals take backslashes verbatim.
fn skip_string_literal(line: &[u8], start: usize) -> usize {
    let mut flags = 0u8;
    let mut i = start;

    while i < line.len() && (line[i] == b'!' || line[i] == b'\\') {
        if line[i] == b'\\' {
            flags = RAW_MODE;
        }
        i += 1;
    }

    let Some(&quote) = line.get(i) else { return i };
    i += 1;

    while i < line.len() && line[i] != quote {
        let (next, _) = literal_char(line, i, flags);
        i = next;
    }

    i
}

/// Skip over the bracketed group opening at `start`, returning the index of
/// the balancing close bracket (or the end of input if unbalanced). String
/// literals inside the group are skipped atomically.
fn skip_balanced_group(line: &[u8], start: usize) -> usize {
    let open = line[start];
    let close = match open {
        b'(' => b')',
        b'{' => b'}',
        b'[' => b']',
        b'<' => b'>',
        _ => return start,
    };

    let mut nest = 0u32;
    let mut i = start + 1;

    while i < line.len() && (line[i] != close || nest > 0) {
        if line[i] == open {
            nest += 1;
        } else if line[i] == close {
            nest -= 1;
        } else if is_string_start(&line[i..]) {
            i = skip_string_literal(line, i);
        }
        if i >= line.len() {
            break;
        }
        i += 1;
    }

    i
}

/// Match `sub`'s pattern against `text` and expand its template.
///
/// `text` must begin exactly at the macro-name occurrence and must not
/// contain a newline before the match ends (the caller passes one line's
/// tail). Returns `None` when the pattern does not match — including for
/// malformed macro definitions (empty name prefix, `%` not followed by a
/// digit, a placeholder with no terminator), which must never block matching
/// against other macros.
pub fn try_match(sub: &Substitute, text: &str) -> Option<MatchOutcome> {
    let pattern = sub.pattern.as_bytes();
    let input = text.as_bytes();

    let prefix_len = pattern.iter().take_while(|&&b| is_symbol_char(b)).count();
    if prefix_len == 0 || input.len() < prefix_len || input[..prefix_len] != pattern[..prefix_len] {
        return None;
    }

    let mut slots: [Option<&str>; 10] = [None; 10];
    let mut start = prefix_len;
    let mut po = prefix_len;

    while start < input.len() && po < pattern.len() {
        if pattern[po] == b'%' {
            po += 1;
            let digit = *pattern.get(po)?;
            if !digit.is_ascii_digit() {
                return None;
            }
            let slot = usize::from(digit - b'0');
            po += 1;
            // The raw next pattern byte terminates the capture.
            let term = *pattern.get(po)?;

            let mut end = start;
            while end < input.len() && input[end] != b'\n' && input[end] != term {
                if is_string_start(&input[end..]) {
                    end = skip_string_literal(input, end);
                } else if matches!(input[end], b'(' | b'{' | b'[') {
                    end = skip_balanced_group(input, end);
                }
                if end < input.len() {
                    end += 1;
                }
            }

            slots[slot] = Some(&text[start..end]);

            if end >= input.len() || input[end] != term {
                // Newline or end of input before the terminator.
                return None;
            }
            start = end + 1;
            po += 1;
        } else {
            // Skip input whitespace before a literal, except between two
            // identifier-class pattern characters or a repeated character.
            if !is_symbol_char(pattern[po]) && pattern[po - 1] != pattern[po] {
                while start < input.len() && input[start] <= b' ' {
                    start += 1;
                }
            }

            let (next_po, code) = literal_char(pattern, po, 0);
            po = next_po;

            if start >= input.len() || u32::from(input[start]) != code {
                return None;
            }
            start += 1;
        }
    }

    if po < pattern.len() {
        // Input ran dry before the pattern was exhausted.
        return None;
    }

    // Boundary rule: a macro name must not match as a prefix of a longer
    // identifier.
    if is_symbol_char(pattern[pattern.len() - 1])
        && start < input.len()
        && is_symbol_char(input[start])
    {
        return None;
    }

    Some(MatchOutcome {
        expansion: expand(&sub.substitution, &slots),
        consumed: start,
    })
}

/// Fill a substitution template from the captured slots. Placeholders whose
/// slot was never captured are copied through literally; placeholders inside
/// string literals are substituted the same as outside.
fn expand(template: &str, slots: &[Option<&str>; 10]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);

        match tail.as_bytes().get(1) {
            Some(&d) if d.is_ascii_digit() => {
                match slots[usize::from(d - b'0')] {
                    Some(captured) => out.push_str(captured),
                    None => out.push_str(&tail[..2]),
                }
                rest = &tail[2..];
            }
            _ => {
                out.push('%');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_macro() -> Substitute {
        Substitute {
            pattern: "MAX(%0,%1)".to_string(),
            match_length: 3,
            substitution: "((%0)>(%1)?(%0):(%1))".to_string(),
            detail: String::new(),
        }
    }

    #[test]
    fn test_round_trip() {
        let m = try_match(&max_macro(), "MAX(a,b)").unwrap();
        assert_eq!(m.expansion, "((a)>(b)?(a):(b))");
        assert_eq!(m.consumed, "MAX(a,b)".len());
    }

    #[test]
    fn test_nested_group_capture() {
        let m = try_match(&max_macro(), "MAX(f(1,2),3)").unwrap();
        assert_eq!(m.expansion, "((f(1,2))>(3)?(f(1,2)):(3))");
        assert_eq!(m.consumed, "MAX(f(1,2),3)".len());
    }

    #[test]
    fn test_string_atomic_in_capture() {
        let sub = Substitute {
            pattern: "LOG(%0)".to_string(),
            match_length: 3,
            substitution: "print(%0)".to_string(),
            detail: String::new(),
        };
        let m = try_match(&sub, "LOG(\"a)b\")").unwrap();
        assert_eq!(m.expansion, "print(\"a)b\")");
    }

    #[test]
    fn test_boundary_rule() {
        let sub = Substitute {
            pattern: "FOO".to_string(),
            match_length: 3,
            substitution: "1".to_string(),
            detail: String::new(),
        };
        assert!(try_match(&sub, "FOOBAR").is_none());
        assert!(try_match(&sub, "FOO + 1").is_some());
        assert!(try_match(&sub, "FOO").is_some());
    }

    #[test]
    fn test_unfilled_placeholder_copied_through() {
        let sub = Substitute {
            pattern: "ID(%0)".to_string(),
            match_length: 2,
            substitution: "%2".to_string(),
            detail: String::new(),
        };
        let m = try_match(&sub, "ID(x)").unwrap();
        assert_eq!(m.expansion, "%2");
    }

    #[test]
    fn test_whitespace_skipped_before_literals() {
        // Whitespace before `(` is skipped; captured chunks keep their own
        // spacing verbatim.
        let m = try_match(&max_macro(), "MAX (a , b)").unwrap();
        assert_eq!(m.expansion, "((a )>( b)?(a ):( b))");
    }

    #[test]
    fn test_newline_fails_capture() {
        assert!(try_match(&max_macro(), "MAX(a,\nb)").is_none());
    }

    #[test]
    fn test_unterminated_input_fails() {
        assert!(try_match(&max_macro(), "MAX(a,b").is_none());
        assert!(try_match(&max_macro(), "MAX").is_none());
    }

    #[test]
    fn test_malformed_macro_is_local_no_match() {
        // `%` not followed by a digit
        let bad = Substitute {
            pattern: "BAD(%x)".to_string(),
            match_length: 3,
            substitution: "0".to_string(),
            detail: String::new(),
        };
        assert!(try_match(&bad, "BAD(1)").is_none());

        // pattern ends right after a placeholder
        let tailless = Substitute {
            pattern: "T(%0".to_string(),
            match_length: 1,
            substitution: "0".to_string(),
            detail: String::new(),
        };
        assert!(try_match(&tailless, "T(1)").is_none());

        // empty name prefix
        let nameless = Substitute {
            pattern: "(%0)".to_string(),
            match_length: 0,
            substitution: "0".to_string(),
            detail: String::new(),
        };
        assert!(try_match(&nameless, "(1)").is_none());
    }

    #[test]
    fn test_escape_decoding_in_pattern() {
        // `\%` in the pattern is a literal percent sign, not a placeholder
        let sub = Substitute {
            pattern: "P\\%%0;".to_string(),
            match_length: 1,
            substitution: "[%0]".to_string(),
            detail: String::new(),
        };
        let m = try_match(&sub, "P%x;").unwrap();
        assert_eq!(m.expansion, "[x]");
        assert_eq!(m.consumed, "P%x;".len());
    }

    #[test]
    fn test_placeholder_substituted_inside_template_string() {
        let sub = Substitute {
            pattern: "GREET(%0)".to_string(),
            match_length: 5,
            substitution: "print(\"hi %0\")".to_string(),
            detail: String::new(),
        };
        let m = try_match(&sub, "GREET(bob)").unwrap();
        assert_eq!(m.expansion, "print(\"hi bob\")");
    }

    #[test]
    fn test_literal_char_decoding() {
        assert_eq!(literal_char(b"a", 0, 0), (1, u32::from(b'a')));
        assert_eq!(literal_char(b"\\n", 0, 0), (2, 10));
        assert_eq!(literal_char(b"\\x41;", 0, 0), (5, 0x41));
        assert_eq!(literal_char(b"\\65;", 0, 0), (4, 65));
        assert_eq!(literal_char(b"\\\\", 0, 0), (2, u32::from(b'\\')));
        assert_eq!(literal_char(b"\\%", 0, 0), (2, u32::from(b'%')));
        // raw mode takes the backslash verbatim
        assert_eq!(literal_char(b"\\n", 0, RAW_MODE), (1, u32::from(b'\\')));
    }

    #[test]
    fn test_skip_string_literal() {
        let line = b"\"ab\\\"c\" rest";
        assert_eq!(skip_string_literal(line, 0), 6);
        // packed raw string: backslashes are verbatim, so the second quote ends it
        let packed = b"!\\\"ab\\\"c";
        assert_eq!(skip_string_literal(packed, 0), 6);
    }

    #[test]
    fn test_skip_balanced_group() {
        let line = b"(a(b)c)d";
        assert_eq!(skip_balanced_group(line, 0), 6);
        let with_string = b"(\")\")x";
        assert_eq!(skip_balanced_group(with_string, 0), 4);
    }
}
