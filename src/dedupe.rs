// 🔁 Deduplication & Ordering Utilities
// Id-keyed stable dedupe + never-throwing JSON parsing, shared by all normalizers

use serde::de::DeserializeOwned;
use std::collections::HashSet;

// ============================================================================
// ID-KEYED DEDUPE
// ============================================================================

/// Deduplicate a list by id, keeping the FIRST occurrence of each id.
///
/// Rules:
/// - Stable: surviving elements keep their original relative order
/// - First-occurrence-wins: later duplicates are dropped, never merged
/// - Elements without a valid positive id (`id_of` returns `None`) are never
///   deduplicated against each other: each one is kept
///
/// Single pass, O(n) with a seen-id set.
pub fn dedupe_by_id<T, F>(items: Vec<T>, id_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<i64>,
{
    let mut seen: HashSet<i64> = HashSet::with_capacity(items.len());
    let mut result = Vec::with_capacity(items.len());

    for item in items {
        match id_of(&item) {
            Some(id) if id > 0 => {
                if seen.insert(id) {
                    result.push(item);
                }
            }
            // No usable id: un-dedupable, display-only entry. Keep it.
            _ => result.push(item),
        }
    }

    result
}

// ============================================================================
// SAFE JSON PARSING
// ============================================================================

/// Strictly parse a JSON string into `T`, returning `None` on any failure.
///
/// This is the only JSON entry point the normalizers use directly on
/// untrusted strings: it never panics and never propagates an error.
pub fn safe_parse_json<T: DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_str(value).ok()
}

/// Untyped variant of [`safe_parse_json`], for payloads whose shape is only
/// discovered after parsing (union payloads, §variant detection).
pub fn safe_parse_json_value(value: &str) -> Option<serde_json::Value> {
    safe_parse_json::<serde_json::Value>(value)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Ref {
        id: Option<i64>,
        name: &'static str,
    }

    fn r(id: Option<i64>, name: &'static str) -> Ref {
        Ref { id, name }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let input = vec![r(Some(5), "Acme"), r(Some(5), "Acme Inc")];
        let out = dedupe_by_id(input, |x| x.id);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Acme");
    }

    #[test]
    fn test_order_preserved() {
        let input = vec![
            r(Some(3), "c"),
            r(Some(1), "a"),
            r(Some(3), "c2"),
            r(Some(2), "b"),
        ];
        let out = dedupe_by_id(input, |x| x.id);

        let names: Vec<&str> = out.iter().map(|x| x.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![r(Some(1), "a"), r(Some(2), "b"), r(Some(1), "a2")];
        let once = dedupe_by_id(input, |x| x.id);
        let twice = dedupe_by_id(once.clone(), |x| x.id);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_ids_never_merged() {
        let input = vec![r(None, "plain"), r(None, "plain"), r(Some(7), "x")];
        let out = dedupe_by_id(input, |x| x.id);

        // Both id-less entries survive even though they look identical
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_non_positive_ids_treated_as_missing() {
        let input = vec![r(Some(0), "zero"), r(Some(0), "zero"), r(Some(-4), "neg")];
        let out = dedupe_by_id(input, |x| x.id);

        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_safe_parse_json_valid() {
        let v = safe_parse_json_value(r#"{"id": 5}"#).unwrap();
        assert_eq!(v, json!({"id": 5}));
    }

    #[test]
    fn test_safe_parse_json_never_fails_loudly() {
        assert!(safe_parse_json_value("").is_none());
        assert!(safe_parse_json_value("{truncated").is_none());
        assert!(safe_parse_json_value("not json at all").is_none());
    }

    #[test]
    fn test_safe_parse_json_typed() {
        let ids: Option<Vec<i64>> = safe_parse_json("[1, 2, 3]");
        assert_eq!(ids, Some(vec![1, 2, 3]));

        let bad: Option<Vec<i64>> = safe_parse_json(r#"{"not": "a list"}"#);
        assert_eq!(bad, None);
    }
}
