//! Property-based tests for field-path expressions using proptest
//!
//! These verify the parser's round-trip laws over randomized inputs:
//! plain dotted paths always split into exactly their identifiers, and
//! bracket-quoted segments keep their literal text.

use declarest::path::{lookup, parse};
use proptest::prelude::*;
use serde_json::Value;

/// A plain identifier: no dots, brackets, quotes, or spaces.
fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_-]{0,15}"
}

fn arb_identifiers() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_identifier(), 1..6)
}

/// A field name containing at least one literal dot, as would need
/// bracket quoting.
fn arb_dotted_field() -> impl Strategy<Value = String> {
    (arb_identifier(), arb_identifier()).prop_map(|(a, b)| format!("{a}.{b}"))
}

proptest! {
    /// Joining identifiers with dots and parsing yields them back in order.
    #[test]
    fn plain_paths_round_trip(segments in arb_identifiers()) {
        let path = segments.join(".");
        prop_assert_eq!(parse(&path).unwrap(), segments);
    }

    /// Bracket quoting preserves a literal-dot field as one segment,
    /// with either quote style.
    #[test]
    fn bracket_segments_round_trip(
        prefix in arb_identifier(),
        field in arb_dotted_field(),
        double_quotes in any::<bool>(),
    ) {
        let path = if double_quotes {
            format!("{prefix}[\"{field}\"]")
        } else {
            format!("{prefix}['{field}']")
        };
        prop_assert_eq!(parse(&path).unwrap(), vec![prefix, field]);
    }

    /// Parsed paths resolve to the value they were built from.
    #[test]
    fn lookup_agrees_with_construction(
        segments in arb_identifiers(),
        leaf in "[a-z0-9]{1,12}",
    ) {
        // Build a nested document along the segments.
        let mut document = Value::String(leaf.clone());
        for segment in segments.iter().rev() {
            let mut map = serde_json::Map::new();
            map.insert(segment.clone(), document);
            document = Value::Object(map);
        }
        let parsed = parse(&segments.join(".")).unwrap();
        prop_assert_eq!(lookup(&document, &parsed), Some(&Value::String(leaf)));
    }

    /// Doubling any dot makes the path malformed.
    #[test]
    fn doubled_dots_always_fail(segments in prop::collection::vec(arb_identifier(), 2..5)) {
        let path = segments.join("..");
        prop_assert!(parse(&path).is_err());
    }

    /// Leading and trailing dots are always malformed.
    #[test]
    fn leading_and_trailing_dots_fail(segment in arb_identifier()) {
        let leading = format!(".{segment}");
        prop_assert!(parse(&leading).is_err());
        let trailing = format!("{segment}.");
        prop_assert!(parse(&trailing).is_err());
    }

    /// An embedded space anywhere outside brackets is malformed.
    #[test]
    fn embedded_spaces_fail(a in arb_identifier(), b in arb_identifier()) {
        let path = format!("{a} {b}");
        prop_assert!(parse(&path).is_err());
    }

    /// An unmatched opening bracket is malformed.
    #[test]
    fn unmatched_brackets_fail(a in arb_identifier(), field in arb_identifier()) {
        let unclosed = format!("{a}['{field}'");
        prop_assert!(parse(&unclosed).is_err());
        let unterminated = format!("{a}['{field}");
        prop_assert!(parse(&unterminated).is_err());
    }
}
