//! Transform rules applied between extract and load.
//!
//! A transform is an ordered list of rules. Each rule declares whether it
//! applies to a given frame (usually keyed on the presence of a column) and
//! rewrites the frame when it does. Rules that do not apply are skipped, so the
//! same rule set works for any input schema.
//!
//! The standard order is:
//! 1. normalize column names
//! 2. coerce `price` to f64
//! 3. coerce `quantity` to i64
//! 4. drop rows with a missing `id`
//! 5. remove duplicate rows
//! 6. derive `tax_amount`

pub mod coercion;
pub mod columns;
pub mod derived;
pub mod filters;

use crate::config::TransformConfig;
use crate::constants::columns::{ID, PRICE, QUANTITY};
use crate::error::Result;
use polars::prelude::DataFrame;
use tracing::debug;

pub use coercion::{CoerceNumeric, NumericTarget};
pub use columns::{NormalizeColumnNames, normalize_column_name};
pub use derived::TaxAmount;
pub use filters::{DeduplicateRows, DropMissing};

/// A single predicate-guarded transform step
pub trait TransformRule: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether the rule has anything to do for this frame
    fn applies_to(&self, df: &DataFrame) -> bool;

    /// Rewrite the frame
    fn apply(&self, df: DataFrame) -> Result<DataFrame>;
}

/// Whether the frame has a column with exactly this name
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Ordered collection of transform rules
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn TransformRule>>,
}

impl RuleSet {
    /// Empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard normalization, coercion, filtering and derivation rules
    pub fn standard(config: &TransformConfig) -> Self {
        Self::new()
            .with_rule(NormalizeColumnNames)
            .with_rule(CoerceNumeric::new(
                PRICE,
                NumericTarget::Float,
                config.coercion_policy,
            ))
            .with_rule(CoerceNumeric::new(
                QUANTITY,
                NumericTarget::Integer,
                config.coercion_policy,
            ))
            .with_rule(DropMissing::new(ID))
            .with_rule(DeduplicateRows)
            .with_rule(TaxAmount::new(config.tax_rate))
    }

    /// Append a rule to the end of the set
    pub fn with_rule(mut self, rule: impl TransformRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Rule names in application order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every applicable rule in order
    pub fn apply(&self, mut df: DataFrame) -> Result<DataFrame> {
        for rule in &self.rules {
            if !rule.applies_to(&df) {
                debug!("Skipping rule '{}': not applicable", rule.name());
                continue;
            }

            let rows_before = df.height();
            df = rule.apply(df)?;
            debug!(
                "Applied rule '{}': {} -> {} rows, {} columns",
                rule.name(),
                rows_before,
                df.height(),
                df.width()
            );
        }
        Ok(df)
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rule_names())
            .finish()
    }
}
