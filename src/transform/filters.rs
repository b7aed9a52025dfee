//! Row filters: missing-key removal and deduplication.

use super::{TransformRule, has_column};
use crate::error::Result;
use polars::prelude::*;

/// Drops every row whose value in `column` is missing
#[derive(Debug, Clone)]
pub struct DropMissing {
    column: String,
    rule_name: String,
}

impl DropMissing {
    pub fn new(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            rule_name: format!("drop_missing_{}", column),
            column,
        }
    }
}

impl TransformRule for DropMissing {
    fn name(&self) -> &str {
        &self.rule_name
    }

    fn applies_to(&self, df: &DataFrame) -> bool {
        has_column(df, &self.column)
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mask = df
            .column(&self.column)?
            .as_materialized_series()
            .is_not_null();
        Ok(df.filter(&mask)?)
    }
}

/// Removes rows equal in every column to an earlier row.
///
/// The first occurrence is kept and the original row order is preserved.
/// Missing values compare equal to each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicateRows;

impl TransformRule for DeduplicateRows {
    fn name(&self) -> &str {
        "deduplicate_rows"
    }

    fn applies_to(&self, df: &DataFrame) -> bool {
        df.width() > 0
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        Ok(df
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_drop_missing_ids() {
        let df = df!(
            "id" => [Some("1"), None, Some("3"), None, Some("5")],
            "name" => ["a", "b", "c", "d", "e"]
        )
        .unwrap();
        let original = df.height();
        let missing = df.column("id").unwrap().null_count();

        let out = DropMissing::new("id").apply(df).unwrap();

        assert_eq!(out.height(), original - missing);
        assert_eq!(out.column("id").unwrap().null_count(), 0);
        assert_eq!(
            str_values(&out, "name"),
            vec![
                Some("a".to_string()),
                Some("c".to_string()),
                Some("e".to_string())
            ]
        );
    }

    #[test]
    fn test_drop_missing_keeps_nulls_in_other_columns() {
        let df = df!(
            "id" => ["1", "2"],
            "note" => [None, Some("x")]
        )
        .unwrap();

        let out = DropMissing::new("id").apply(df).unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(out.column("note").unwrap().null_count(), 1);
    }

    #[test]
    fn test_drop_missing_applies_only_with_column() {
        let rule = DropMissing::new("id");
        assert_eq!(rule.name(), "drop_missing_id");
        assert!(!rule.applies_to(&df!("key" => ["1"]).unwrap()));
        assert!(rule.applies_to(&df!("id" => ["1"]).unwrap()));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_in_order() {
        let df = df!(
            "id" => ["3", "1", "3", "2", "1"],
            "value" => ["c", "a", "c", "b", "a"]
        )
        .unwrap();

        let out = DeduplicateRows.apply(df).unwrap();

        assert_eq!(
            str_values(&out, "id"),
            vec![
                Some("3".to_string()),
                Some("1".to_string()),
                Some("2".to_string())
            ]
        );
    }

    #[test]
    fn test_dedup_requires_full_row_equality() {
        let df = df!(
            "id" => ["1", "1"],
            "value" => ["a", "b"]
        )
        .unwrap();

        let out = DeduplicateRows.apply(df).unwrap();

        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_dedup_treats_missing_values_as_equal() {
        let df = df!(
            "id" => ["1", "1"],
            "note" => [None::<&str>, None]
        )
        .unwrap();

        let out = DeduplicateRows.apply(df).unwrap();

        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let df = df!(
            "a" => ["x", "y", "x", "z", "y"],
            "b" => [Some(1.0), None, Some(1.0), Some(2.0), None]
        )
        .unwrap();

        let once = DeduplicateRows.apply(df).unwrap();
        let twice = DeduplicateRows.apply(once.clone()).unwrap();

        assert_eq!(once.height(), 3);
        assert!(once.equals_missing(&twice));
    }
}
