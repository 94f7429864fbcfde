// SPDX-License-Identifier: MIT
//! Exclusion matcher — decides whether a result row is a previously accepted
//! false positive.
//!
//! An exclusion is a partial field-matcher: it names a subset of columns and
//! the exact string value each must have. A row matches iff every named
//! column is present with an exactly equal value; columns the exclusion does
//! not name are wildcards.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::Exclusion;
use crate::error::MalformedExclusionError;
use crate::executor::ResultRow;

/// An exclusion's stored document parsed into column → expected value pairs.
pub type ExclusionFields = BTreeMap<String, String>;

/// Parse an exclusion's stored JSON document.
///
/// The document must be a flat JSON object; scalar values (strings, numbers,
/// booleans) are compared by their string form. Nested objects, arrays, and
/// non-object documents are malformed — the caller skips the exclusion and
/// records a config error rather than silently treating it as "no match".
pub fn parse_exclusion(
    topic: &str,
    exclusion: &Exclusion,
) -> Result<ExclusionFields, MalformedExclusionError> {
    let malformed = |message: String| MalformedExclusionError {
        topic: topic.to_string(),
        exclusion_id: exclusion.id,
        message,
    };

    let value: Value = serde_json::from_str(&exclusion.raw)
        .map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let Value::Object(object) = value else {
        return Err(malformed("exclusion document is not a JSON object".to_string()));
    };

    let mut fields = ExclusionFields::new();
    for (column, value) in object {
        let expected = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => crate::executor::NULL_SENTINEL.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(malformed(format!(
                    "column `{column}` has a non-scalar value"
                )));
            }
        };
        fields.insert(column, expected);
    }
    Ok(fields)
}

/// True iff every column the exclusion names is present in the row with an
/// exactly equal value. Case-sensitive, no type coercion.
pub fn row_matches_exclusion(row: &ResultRow, fields: &ExclusionFields) -> bool {
    fields
        .iter()
        .all(|(column, expected)| row.get(column) == Some(expected.as_str()))
}

/// True iff any exclusion matches the row. A check with zero exclusions
/// never filters rows.
pub fn is_excluded(row: &ResultRow, exclusions: &[ExclusionFields]) -> bool {
    exclusions.iter().any(|fields| row_matches_exclusion(row, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn exclusion(raw: &str) -> Exclusion {
        Exclusion {
            id: 1,
            raw: raw.to_string(),
        }
    }

    fn parse(raw: &str) -> ExclusionFields {
        parse_exclusion("Topic", &exclusion(raw)).unwrap()
    }

    #[test]
    fn test_subset_match() {
        let fields = parse(r#"{"country":"Brazil"}"#);
        let brazil = ResultRow::from_pairs([("country", "Brazil"), ("id", "5")]);
        let usa = ResultRow::from_pairs([("country", "USA"), ("id", "5")]);
        assert!(row_matches_exclusion(&brazil, &fields));
        assert!(!row_matches_exclusion(&usa, &fields));
    }

    #[test]
    fn test_all_declared_columns_must_match() {
        let fields = parse(r#"{"country":"Brazil","competitionId":"COMP2026"}"#);
        let row = ResultRow::from_pairs([("country", "Brazil"), ("competitionId", "COMP2025")]);
        assert!(!row_matches_exclusion(&row, &fields));
    }

    #[test]
    fn test_missing_column_is_no_match() {
        let fields = parse(r#"{"country":"Brazil"}"#);
        let row = ResultRow::from_pairs([("id", "5")]);
        assert!(!row_matches_exclusion(&row, &fields));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let fields = parse(r#"{"country":"brazil"}"#);
        let row = ResultRow::from_pairs([("country", "Brazil")]);
        assert!(!row_matches_exclusion(&row, &fields));
    }

    #[test]
    fn test_empty_exclusion_list_never_filters() {
        let row = ResultRow::from_pairs([("id", "5")]);
        assert!(!is_excluded(&row, &[]));
    }

    #[test]
    fn test_scalar_values_stringified() {
        let fields = parse(r#"{"id":5,"active":true}"#);
        let row = ResultRow::from_pairs([("id", "5"), ("active", "true")]);
        assert!(row_matches_exclusion(&row, &fields));
    }

    #[test]
    fn test_null_value_matches_sentinel() {
        let fields = parse(r#"{"deleted_at":null}"#);
        let row = ResultRow::from_pairs([("deleted_at", "NULL")]);
        assert!(row_matches_exclusion(&row, &fields));
        let empty = ResultRow::from_pairs([("deleted_at", "")]);
        assert!(!row_matches_exclusion(&empty, &fields));
    }

    #[test]
    fn test_non_object_document_is_malformed() {
        for raw in ["[1,2]", "\"country\"", "42", "not json at all"] {
            let err = parse_exclusion("Topic", &exclusion(raw)).unwrap_err();
            assert_eq!(err.exclusion_id, 1);
            assert_eq!(err.topic, "Topic");
        }
    }

    #[test]
    fn test_nested_value_is_malformed() {
        assert!(parse_exclusion("Topic", &exclusion(r#"{"a":{"b":"c"}}"#)).is_err());
        assert!(parse_exclusion("Topic", &exclusion(r#"{"a":["b"]}"#)).is_err());
    }

    proptest! {
        // Pure function: the same row/exclusion pair always yields the same
        // answer, and a row always matches an exclusion built from a subset
        // of its own columns.
        #[test]
        fn prop_matcher_is_idempotent_and_reflexive(
            pairs in proptest::collection::vec(("[a-z]{1,8}", "[ -~]{0,12}"), 1..6)
        ) {
            let row = ResultRow::from_pairs(pairs.clone());
            let fields: ExclusionFields = pairs.into_iter().collect();
            // Duplicate column names collapse in the map; the surviving
            // value is the row's, so the subset match still holds.
            let fields: ExclusionFields = fields
                .into_iter()
                .filter(|(k, _)| row.get(k).is_some())
                .map(|(k, _)| {
                    let v = row.get(&k).unwrap().to_string();
                    (k, v)
                })
                .collect();
            let first = row_matches_exclusion(&row, &fields);
            let second = row_matches_exclusion(&row, &fields);
            prop_assert!(first);
            prop_assert_eq!(first, second);
        }
    }
}
