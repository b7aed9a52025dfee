//! Source file reading.
//!
//! Reads a comma-delimited file with a header row into a DataFrame. Every
//! column is read as text; typing is left to the transform rules.

use crate::config::TransformConfig;
use crate::constants::DEFAULT_DELIMITER;
use crate::error::{LoaderError, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Read a source file into an all-string DataFrame
pub fn read_source(path: &Path, config: &TransformConfig) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(LoaderError::read(path, "file not found"));
    }

    debug!("Reading source file: {}", path.display());

    let null_values = NullValues::AllColumns(
        config
            .null_values
            .iter()
            .map(|value| value.as_str().into())
            .collect(),
    );

    let parse_options = CsvParseOptions::default()
        .with_separator(DEFAULT_DELIMITER)
        .with_missing_is_null(true)
        .with_null_values(Some(null_values));

    // A zero-length inference window makes polars read every column as String
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .and_then(blank_fields_to_null)
        .map_err(|e| LoaderError::read(path, e.to_string()))
}

/// Treat empty text as missing.
///
/// The reader only maps unquoted empty fields to null; a quoted `""` arrives
/// as an empty string.
fn blank_fields_to_null(df: DataFrame) -> PolarsResult<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            let text = column.as_materialized_series().cast(&DataType::String)?;
            let values: StringChunked = text
                .str()?
                .into_iter()
                .map(|cell| cell.filter(|value| !value.is_empty()))
                .collect();
            Ok(Column::from(values.with_name(column.name().clone()).into_series()))
        })
        .collect::<PolarsResult<Vec<_>>>()?;

    DataFrame::new(columns)
}
