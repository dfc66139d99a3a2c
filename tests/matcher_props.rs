//! Property-based tests for the substitution matcher
//!
//! These use proptest to verify matcher invariants across many randomly
//! generated inputs, catching edge cases hand-written tests might miss.

use proptest::prelude::*;

use pawnls::grammar::matcher::try_match;
use pawnls::grammar::preview::preview_line;
use pawnls::grammar::symbol::Substitute;

fn max_macro() -> Substitute {
    Substitute {
        pattern: "MAX(%0,%1)".to_string(),
        match_length: 3,
        substitution: "((%0)>(%1)?(%0):(%1))".to_string(),
        detail: String::new(),
    }
}

fn object_macro(name: &str, body: &str) -> Substitute {
    Substitute {
        pattern: name.to_string(),
        match_length: name.len(),
        substitution: body.to_string(),
        detail: String::new(),
    }
}

proptest! {
    /// Simple identifier arguments always round-trip through capture and
    /// expansion, and the whole call is consumed.
    #[test]
    fn prop_round_trip_simple_args(a in "[a-z_][a-z0-9_]{0,7}", b in "[a-z_][a-z0-9_]{0,7}") {
        let input = format!("MAX({a},{b})");
        let m = try_match(&max_macro(), &input).expect("simple call must match");
        prop_assert_eq!(m.consumed, input.len());
        prop_assert_eq!(m.expansion, format!("(({a})>({b})?({a}):({b}))"));
    }

    /// Nested parenthesized arguments never terminate a capture early.
    #[test]
    fn prop_nested_args_balanced(a in "[a-z]{1,5}", b in "[a-z]{1,5}") {
        let input = format!("MAX(f({a},{b}),{b})");
        let m = try_match(&max_macro(), &input).expect("nested call must match");
        prop_assert_eq!(m.consumed, input.len());
        let needle = format!("f({a},{b})");
        prop_assert!(m.expansion.contains(&needle));
    }

    /// A macro never matches a longer identifier sharing its name as a
    /// prefix.
    #[test]
    fn prop_no_prefix_match(suffix in "[A-Za-z0-9_@]{1,6}") {
        let sub = object_macro("FOO", "1");
        let input = format!("FOO{suffix}");
        prop_assert!(try_match(&sub, &input).is_none());
    }

    /// Identifiers that name no macro never produce a preview.
    #[test]
    fn prop_unknown_identifier_no_preview(name in "[a-z][a-z0-9_]{0,7}") {
        let subs = vec![object_macro("FOO", "1")];
        prop_assert!(preview_line(&name, &subs).is_none());
    }

    /// The preview applies at most one substitution: expanding a line with
    /// two macro occurrences leaves the second occurrence verbatim.
    #[test]
    fn prop_preview_single_substitution(gap in "[ +/*-]{1,4}") {
        let subs = vec![object_macro("VAL", "42")];
        let input = format!("VAL{gap}VAL");
        let out = preview_line(&input, &subs).expect("first occurrence expands");
        prop_assert_eq!(out, format!("42{gap}VAL"));
    }

    /// Unfilled placeholders survive expansion literally, whatever the slot.
    #[test]
    fn prop_unfilled_placeholder_literal(slot in 1u8..=9) {
        let sub = Substitute {
            pattern: "ID(%0)".to_string(),
            match_length: 2,
            substitution: format!("%{slot}"),
            detail: String::new(),
        };
        let m = try_match(&sub, "ID(x)").expect("call must match");
        prop_assert_eq!(m.expansion, format!("%{slot}"));
    }
}
