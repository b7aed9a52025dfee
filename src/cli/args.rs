//! Command-line argument definitions for tabload
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::CoercionPolicy;
use crate::{LoaderError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the tabular loader
///
/// Loads CSV files into relational tables, applying a fixed set of cleaning
/// rules on the way in.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tabload",
    version,
    about = "Load CSV files into warehouse tables with a fixed cleaning pipeline",
    long_about = "Reads CSV sources, normalizes column names, coerces price and quantity \
                  to numbers, drops rows without an id, removes duplicate rows and derives \
                  a tax_amount column before replacing the destination table. Tasks are \
                  described in a TOML pipeline file and run concurrently."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging output
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the tasks of a pipeline file
    Run(RunArgs),
    /// Load a single CSV file into a SQLite table
    Load(LoadArgs),
    /// Parse and validate a pipeline file without running it
    Validate(ValidateArgs),
}

/// Arguments for the run command
#[derive(Debug, Clone, Parser)]
pub struct RunArgs {
    /// Pipeline file
    ///
    /// Defaults to ./pipeline.toml, then the user config directory.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run only the named task (repeatable)
    #[arg(short = 't', long = "task", value_name = "TASK_ID")]
    pub tasks: Vec<String>,

    /// Override the maximum number of concurrent tasks
    #[arg(short = 'j', long = "max-parallel", value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Extract and transform only; nothing is written
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Disable the per-task progress spinners
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

/// Arguments for the load command
#[derive(Debug, Clone, Parser)]
pub struct LoadArgs {
    /// Source CSV file
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination table, replaced if it exists
    #[arg(value_name = "TABLE")]
    pub table: String,

    /// SQLite database file, created if missing
    #[arg(short = 'd', long = "database", value_name = "PATH")]
    pub database: PathBuf,

    /// Override the tax rate used for tax_amount
    #[arg(long = "tax-rate", value_name = "RATE")]
    pub tax_rate: Option<f64>,

    /// What to do with non-numeric price or quantity values
    #[arg(long = "coercion-policy", value_enum)]
    pub coercion_policy: Option<CoercionPolicy>,

    /// Extract and transform only; print a preview instead of writing
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// Arguments for the validate command
#[derive(Debug, Clone, Parser)]
pub struct ValidateArgs {
    /// Pipeline file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Get the log level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress spinners (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

impl RunArgs {
    /// Validate the run arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == Some(0) {
            return Err(LoaderError::configuration(
                "--max-parallel must be at least 1",
            ));
        }

        if self.tasks.iter().any(|task| task.trim().is_empty()) {
            return Err(LoaderError::configuration("--task cannot be empty"));
        }

        Ok(())
    }
}

impl LoadArgs {
    /// Validate the load arguments before touching any file
    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.tax_rate {
            if !rate.is_finite() {
                return Err(LoaderError::configuration(format!(
                    "--tax-rate must be a finite number, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}
