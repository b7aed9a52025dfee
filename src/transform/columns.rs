//! Column name normalization.

use super::TransformRule;
use crate::error::{LoaderError, Result};
use polars::prelude::*;
use std::collections::HashSet;

/// Lowercase a column name and replace each space with an underscore
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Rewrites every column name with [`normalize_column_name`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeColumnNames;

impl TransformRule for NormalizeColumnNames {
    fn name(&self) -> &str {
        "normalize_column_names"
    }

    fn applies_to(&self, _df: &DataFrame) -> bool {
        true
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mut seen = HashSet::new();
        let mut renamed = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let name = normalize_column_name(column.name());
            if !seen.insert(name.clone()) {
                return Err(LoaderError::DuplicateColumn { column: name });
            }

            let mut column = column.clone();
            column.rename(name.into());
            renamed.push(column);
        }

        Ok(DataFrame::new(renamed)?)
    }
}
