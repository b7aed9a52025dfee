//! tabload library
//!
//! Loads delimited text files into relational tables through a fixed,
//! ordered set of cleaning rules.
//!
//! This library provides tools for:
//! - Reading CSV sources with every field kept as text
//! - Normalizing column names and coercing `price`/`quantity` to numbers
//! - Dropping rows without an `id` and removing duplicate rows
//! - Deriving a `tax_amount` column
//! - Replacing destination tables in SQLite in a single transaction
//! - Running many file/table tasks concurrently from a TOML pipeline file

pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod transform;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{CoercionPolicy, PipelineConfig, PipelineSettings, TransformConfig};
pub use error::{LoaderError, Result};
pub use loader::TabularLoader;
pub use models::{LoadJob, LoadStats, RunSummary, TaskOutcome};
pub use pipeline::Pipeline;
pub use sink::{ConnectionHandle, ConnectionRegistry, SqliteSink, TableSink, WriteMode};
pub use transform::{RuleSet, TransformRule};
