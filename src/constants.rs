//! Application constants for the tabular loader
//!
//! This module contains the well-known column names, default values,
//! and file locations used throughout the loader.

// =============================================================================
// Well-Known Columns
// =============================================================================

/// Column names the transform rules key on (post-normalization)
pub mod columns {
    /// Unit price, coerced to floating point
    pub const PRICE: &str = "price";

    /// Item count, coerced to integer
    pub const QUANTITY: &str = "quantity";

    /// Row identifier; rows without one are dropped
    pub const ID: &str = "id";

    /// Derived column appended when both price and quantity are present
    pub const TAX_AMOUNT: &str = "tax_amount";
}

// =============================================================================
// Transform Defaults
// =============================================================================

/// Tax rate applied to `price * quantity`
pub const DEFAULT_TAX_RATE: f64 = 0.05;

/// Tokens treated as missing when reading source files.
///
/// Mirrors the default NA tokens of common dataframe readers so files exported
/// from spreadsheets and notebooks load the same way. Empty fields are always
/// missing regardless of this list.
pub const DEFAULT_NULL_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Field delimiter for source files
pub const DEFAULT_DELIMITER: u8 = b',';

// =============================================================================
// Destination Defaults
// =============================================================================

/// Marker in scratch table names used during a table swap.
///
/// Each swap appends the process id and a sequence number.
pub const STAGING_TABLE_SUFFIX: &str = "__staging";

/// Pattern every destination table name must match
pub const TABLE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Default pipeline configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "pipeline.toml";

/// Application directory name under the user config dir
pub const APP_CONFIG_DIR: &str = "tabload";

/// Default identifier of the pipeline
pub const DEFAULT_DAG_ID: &str = "csv_to_warehouse_etl";

/// Default connection identifier tasks resolve when none is given
pub const DEFAULT_CONNECTION_ID: &str = "warehouse_default";

/// Default number of retries per task (the loader itself never retries)
pub const DEFAULT_RETRIES: u32 = 0;

/// Default delay between task retries in seconds
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 0;

// =============================================================================
// Progress Display
// =============================================================================

/// Spinner tick interval in milliseconds
pub const SPINNER_TICK_MS: u64 = 100;

/// Spinner template used while a task is running
pub const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

/// Maximum rows printed by a dry run preview
pub const PREVIEW_ROWS: usize = 5;

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_column_names_are_normalized() {
        for name in [
            columns::PRICE,
            columns::QUANTITY,
            columns::ID,
            columns::TAX_AMOUNT,
        ] {
            assert_eq!(name, name.to_lowercase());
            assert!(!name.contains(' '));
        }
    }

    #[test]
    fn test_table_name_pattern_compiles() {
        let pattern = Regex::new(TABLE_NAME_PATTERN).unwrap();
        assert!(pattern.is_match("building"));
        assert!(pattern.is_match("_weather_2024"));
        assert!(!pattern.is_match("2024_weather"));
        assert!(!pattern.is_match("drop table; --"));
    }

    #[test]
    fn test_default_null_values_exclude_zero() {
        assert!(!DEFAULT_NULL_VALUES.contains(&"0"));
        assert!(!DEFAULT_NULL_VALUES.contains(&""));
    }
}
