//! Configuration management and validation.
//!
//! Provides the pipeline configuration loaded from TOML: pipeline-level
//! settings, named destination connections, the load tasks themselves,
//! and the transform settings shared by every task.

use crate::constants::{
    APP_CONFIG_DIR, DEFAULT_CONFIG_FILE, DEFAULT_CONNECTION_ID, DEFAULT_DAG_ID,
    DEFAULT_NULL_VALUES, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_SECS, DEFAULT_TAX_RATE,
};
use crate::error::{LoaderError, Result};
use crate::models::LoadJob;
use crate::sink::{ConnectionKind, validate_table_name};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// What to do when a price or quantity value is not numeric
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// Abort the whole invocation on the first bad value
    #[default]
    FailRun,
    /// Drop the offending row and keep going
    DropRow,
}

/// Settings shared by every transform rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Rate applied to `price * quantity` for the derived tax column
    pub tax_rate: f64,

    /// Tokens read as missing values (empty fields are always missing)
    pub null_values: Vec<String>,

    /// Policy for non-numeric price/quantity values
    pub coercion_policy: CoercionPolicy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            null_values: DEFAULT_NULL_VALUES.iter().map(|v| v.to_string()).collect(),
            coercion_policy: CoercionPolicy::FailRun,
        }
    }
}

impl TransformConfig {
    /// Set the tax rate
    pub fn with_tax_rate(mut self, tax_rate: f64) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Replace the missing-value tokens
    pub fn with_null_values<I, S>(mut self, null_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = null_values.into_iter().map(Into::into).collect();
        self
    }

    /// Set the coercion failure policy
    pub fn with_coercion_policy(mut self, policy: CoercionPolicy) -> Self {
        self.coercion_policy = policy;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.tax_rate.is_finite() {
            return Err(LoaderError::configuration(format!(
                "tax_rate must be a finite number, got {}",
                self.tax_rate
            )));
        }
        Ok(())
    }
}

/// Pipeline-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Identifier of the pipeline, used in logs and the run summary
    pub dag_id: String,

    /// Free-form labels
    pub tags: Vec<String>,

    /// Connection used by tasks that do not name one
    pub default_connection: String,

    /// Maximum number of tasks loading at the same time
    pub max_parallel_tasks: usize,

    /// Extra attempts for a task that failed with a retryable error
    pub retries: u32,

    /// Pause between attempts
    pub retry_delay_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            dag_id: DEFAULT_DAG_ID.to_string(),
            tags: vec!["etl".to_string(), "csv".to_string()],
            default_connection: DEFAULT_CONNECTION_ID.to_string(),
            max_parallel_tasks: num_cpus::get(),
            retries: DEFAULT_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl PipelineSettings {
    /// Set the maximum number of concurrent tasks
    pub fn with_max_parallel_tasks(mut self, max_parallel_tasks: usize) -> Self {
        self.max_parallel_tasks = max_parallel_tasks;
        self
    }

    /// Set the retry count and delay
    pub fn with_retries(mut self, retries: u32, retry_delay_secs: u64) -> Self {
        self.retries = retries;
        self.retry_delay_secs = retry_delay_secs;
        self
    }

    /// Pause between attempts as a duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// A named destination connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Store type
    #[serde(default)]
    pub kind: ConnectionKind,

    /// Database location
    pub path: PathBuf,
}

/// One extract-transform-load task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task identifier
    pub task_id: String,

    /// Source CSV file
    pub source: PathBuf,

    /// Destination table, replaced on every run
    pub table: String,

    /// Connection identifier; falls back to the pipeline default
    #[serde(default)]
    pub connection: Option<String>,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,

    #[serde(default)]
    pub tasks: Vec<TaskConfig>,

    #[serde(default)]
    pub transform: TransformConfig,
}

impl PipelineConfig {
    /// Load a configuration file.
    ///
    /// Relative source and database paths are resolved against the directory
    /// containing the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }

        debug!(
            "Loaded pipeline '{}' with {} tasks from {}",
            config.pipeline.dag_id,
            config.tasks.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse a configuration from TOML text without touching paths
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LoaderError::configuration(format!("invalid pipeline file: {}", e)))
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for task in &mut self.tasks {
            if task.source.is_relative() {
                task.source = base.join(&task.source);
            }
        }
        for connection in self.connections.values_mut() {
            if connection.path.is_relative() {
                connection.path = base.join(&connection.path);
            }
        }
    }

    /// Check the configuration for problems that would only surface mid-run
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(LoaderError::configuration("no tasks configured"));
        }

        if self.pipeline.max_parallel_tasks == 0 {
            return Err(LoaderError::configuration(
                "max_parallel_tasks must be at least 1",
            ));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.task_id.as_str()) {
                return Err(LoaderError::configuration(format!(
                    "duplicate task_id '{}'",
                    task.task_id
                )));
            }

            validate_table_name(&task.table)?;

            let connection = self.connection_for(task);
            if !self.connections.contains_key(connection) {
                return Err(LoaderError::ConnectionNotFound {
                    id: connection.to_string(),
                });
            }
        }

        self.transform.validate()
    }

    /// Connection identifier a task resolves to
    pub fn connection_for<'a>(&'a self, task: &'a TaskConfig) -> &'a str {
        task.connection
            .as_deref()
            .unwrap_or(&self.pipeline.default_connection)
    }

    /// Turn the configured tasks into load jobs, in configuration order
    pub fn jobs(&self) -> Vec<LoadJob> {
        self.tasks
            .iter()
            .map(|task| LoadJob {
                task_id: task.task_id.clone(),
                source_path: task.source.clone(),
                table_name: task.table.clone(),
                connection_id: self.connection_for(task).to_string(),
            })
            .collect()
    }
}

/// Locate the pipeline file when none is given on the command line.
///
/// Prefers `./pipeline.toml`, then the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_CONFIG_DIR).join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
}
