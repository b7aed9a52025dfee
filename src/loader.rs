//! The extract-transform-load routine for one file/table pair.
//!
//! A [`TabularLoader`] holds only immutable configuration, so a single
//! instance can serve any number of concurrent invocations. Each invocation
//! owns its DataFrame and opens its own destination connection.

use crate::config::TransformConfig;
use crate::error::Result;
use crate::extract::read_source;
use crate::models::{LoadJob, LoadStats};
use crate::sink::{ConnectionRegistry, WriteMode};
use crate::transform::RuleSet;
use polars::prelude::DataFrame;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Runs extract, transform and load for a single job
#[derive(Debug)]
pub struct TabularLoader {
    transform: TransformConfig,
    rules: RuleSet,
    registry: ConnectionRegistry,
}

impl TabularLoader {
    /// Create a loader with the standard rule set
    pub fn new(transform: TransformConfig, registry: ConnectionRegistry) -> Self {
        let rules = RuleSet::standard(&transform);
        Self {
            transform,
            rules,
            registry,
        }
    }

    /// Replace the transform rules
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Read the source file
    pub fn extract(&self, source: &Path) -> Result<DataFrame> {
        let df = read_source(source, &self.transform)?;
        info!("Extracted {} rows from {}", df.height(), source.display());
        Ok(df)
    }

    /// Apply the transform rules
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let df = self.rules.apply(df)?;
        info!("After transform: ({}, {})", df.height(), df.width());
        Ok(df)
    }

    /// Replace the destination table with `df`
    pub fn load(&self, df: &DataFrame, table: &str, connection_id: &str) -> Result<usize> {
        let handle = self.registry.resolve(connection_id)?;
        let mut sink = handle.open()?;
        let rows = sink.write_table(table, df, WriteMode::Replace)?;
        info!("Loaded {} rows into {}", rows, table);
        Ok(rows)
    }

    /// Extract and transform without touching the destination
    pub fn preview(&self, job: &LoadJob) -> Result<DataFrame> {
        let df = self.extract(&job.source_path)?;
        self.transform(df)
    }

    /// Run the whole pipeline for one job
    pub fn run(&self, job: &LoadJob) -> Result<LoadStats> {
        let start_time = Instant::now();
        info!(
            "Starting ETL for {} -> {}",
            job.source_path.display(),
            job.table_name
        );

        let df = self.extract(&job.source_path)?;
        let rows_extracted = df.height();

        let df = self.transform(df)?;
        let rows_loaded = self.load(&df, &job.table_name, &job.connection_id)?;

        Ok(LoadStats {
            table_name: job.table_name.clone(),
            rows_extracted,
            rows_loaded,
            columns: df
                .get_column_names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
            processing_time_ms: start_time.elapsed().as_millis(),
        })
    }
}
