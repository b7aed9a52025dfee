//! Derived columns.

use super::{TransformRule, has_column};
use crate::constants::columns::{PRICE, QUANTITY, TAX_AMOUNT};
use crate::error::Result;
use polars::prelude::*;

/// Appends `tax_amount = price * quantity * rate` when both inputs exist
#[derive(Debug, Clone, Copy)]
pub struct TaxAmount {
    rate: f64,
}

impl TaxAmount {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl TransformRule for TaxAmount {
    fn name(&self) -> &str {
        TAX_AMOUNT
    }

    fn applies_to(&self, df: &DataFrame) -> bool {
        has_column(df, PRICE) && has_column(df, QUANTITY)
    }

    fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let tax = col(PRICE).cast(DataType::Float64) * col(QUANTITY).cast(DataType::Float64)
            * lit(self.rate);

        Ok(df.lazy().with_column(tax.alias(TAX_AMOUNT)).collect()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_TAX_RATE;

    #[test]
    fn test_tax_amount_row_wise() {
        let df = df!(
            "price" => [10.0, 0.0, 19.99, 3.5],
            "quantity" => [2i64, 3, 7, 0]
        )
        .unwrap();

        let out = TaxAmount::new(DEFAULT_TAX_RATE).apply(df.clone()).unwrap();

        let prices = df.column("price").unwrap().as_materialized_series().f64().unwrap().clone();
        let quantities = df
            .column("quantity")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .clone();
        let taxes = out
            .column("tax_amount")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();

        assert_eq!(out.width(), 3);
        for row in 0..out.height() {
            let expected =
                prices.get(row).unwrap() * quantities.get(row).unwrap() as f64 * 0.05;
            assert!((taxes.get(row).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tax_column_is_appended_last() {
        let df = df!(
            "quantity" => [1i64],
            "price" => [100.0],
            "sku" => ["a"]
        )
        .unwrap();

        let out = TaxAmount::new(0.1).apply(df).unwrap();

        let names: Vec<String> = out
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["quantity", "price", "sku", "tax_amount"]);
        match out.column("tax_amount").unwrap().get(0).unwrap() {
            AnyValue::Float64(tax) => assert!((tax - 10.0).abs() < 1e-9),
            other => panic!("Expected Float64 tax, got {other:?}"),
        }
    }

    #[test]
    fn test_requires_both_columns() {
        let rule = TaxAmount::new(DEFAULT_TAX_RATE);
        assert!(!rule.applies_to(&df!("price" => [1.0]).unwrap()));
        assert!(!rule.applies_to(&df!("quantity" => [1i64]).unwrap()));
        assert!(
            rule.applies_to(&df!("price" => [1.0], "quantity" => [1i64]).unwrap())
        );
    }
}
