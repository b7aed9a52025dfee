//! Numeric coercion of text columns.
//!
//! Missing values become zero, everything else must parse as a number. The
//! coercion policy decides whether an unparsable value aborts the run or only
//! removes its row.

use super::{TransformRule, has_column};
use crate::config::CoercionPolicy;
use crate::error::{LoaderError, Result};
use polars::prelude::*;
use tracing::warn;

/// Target type of a coerced column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericTarget {
    /// 64-bit float
    Float,
    /// 64-bit signed integer; fractional input is truncated toward zero
    Integer,
}

impl NumericTarget {
    pub fn type_name(&self) -> &'static str {
        match self {
            NumericTarget::Float => "f64",
            NumericTarget::Integer => "i64",
        }
    }
}

/// Parse text as a finite float, allowing surrounding whitespace.
///
/// `inf` and `NaN` spellings are rejected so they never reach `tax_amount`.
pub fn parse_float(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Parse text as an integer.
///
/// Accepts plain integers and finite decimal numbers within the i64 range,
/// which are truncated toward zero (`"2.9"` is 2, `"-2.9"` is -2).
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int);
    }

    let float = trimmed.parse::<f64>().ok()?;
    let truncated = float.trunc();
    // i64::MAX is not representable as f64; 2^63 is the first value out of range
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

/// Fills missing values with zero and converts a column to a numeric type
#[derive(Debug, Clone)]
pub struct CoerceNumeric {
    column: String,
    rule_name: String,
    target: NumericTarget,
    policy: CoercionPolicy,
}

impl CoerceNumeric {
    pub fn new(column: impl Into<String>, target: NumericTarget, policy: CoercionPolicy) -> Self {
        let column = column.into();
        Self {
            rule_name: format!("coerce_{}", column),
            column,
            target,
            policy,
        }
    }

    /// Handle one unparsable value according to the policy
    fn reject(&self, row: usize, value: &str, keep: &mut [bool]) -> Result<()> {
        match self.policy {
            CoercionPolicy::FailRun => Err(LoaderError::TypeCoercion {
                column: self.column.clone(),
                row,
                value: value.to_string(),
                target: self.target.type_name(),
            }),
            CoercionPolicy::DropRow => {
                warn!(
                    "Dropping row {}: '{}' in column '{}' is not a valid {}",
                    row,
                    value,
                    self.column,
                    self.target.type_name()
                );
                keep[row] = false;
                Ok(())
            }
        }
    }

    fn coerce(&self, text: &StringChunked, keep: &mut [bool]) -> Result<Series> {
        let name = PlSmallStr::from(self.column.as_str());

        match self.target {
            NumericTarget::Float => {
                let mut values = Vec::with_capacity(text.len());
                for (row, cell) in text.into_iter().enumerate() {
                    let value = match cell {
                        None => 0.0,
                        Some(raw) => match parse_float(raw) {
                            Some(parsed) => parsed,
                            None => {
                                self.reject(row, raw, keep)?;
                                0.0
                            }
                        },
                    };
                    values.push(value);
                }
                Ok(Series::new(name, values))
            }
            NumericTarget::Integer => {
                let mut values = Vec::with_capacity(text.len());
                for (row, cell) in text.into_iter().enumerate() {
                    let value = match cell {
                        None => 0,
                        Some(raw) => match parse_integer(raw) {
                            Some(parsed) => parsed,
                            None => {
                                self.reject(row, raw, keep)?;
                                0
                            }
                        },
                    };
                    values.push(value);
                }
                Ok(Series::new(name, values))
            }
        }
    }
}

impl TransformRule for CoerceNumeric {
    fn name(&self) -> &str {
        &self.rule_name
    }

    fn applies_to(&self, df: &DataFrame) -> bool {
        has_column(df, &self.column)
    }

    fn apply(&self, mut df: DataFrame) -> Result<DataFrame> {
        let text = df
            .column(&self.column)?
            .as_materialized_series()
            .cast(&DataType::String)?;

        let mut keep = vec![true; df.height()];
        let coerced = self.coerce(text.str()?, &mut keep)?;
        df.with_column(coerced)?;

        let dropped = keep.iter().filter(|kept| !**kept).count();
        if dropped == 0 {
            return Ok(df);
        }

        warn!(
            "Dropped {} rows with non-numeric '{}' values",
            dropped, self.column
        );
        let mask: BooleanChunked = keep.into_iter().collect();
        Ok(df.filter(&mask)?)
    }
}
