//! Core data structures for load runs.
//!
//! Defines the load job handed to the loader, per-invocation statistics,
//! and the per-task outcomes reported by a pipeline run.

use crate::error::LoaderError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// One (source file, destination table) binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    pub task_id: String,
    pub source_path: PathBuf,
    pub table_name: String,
    pub connection_id: String,
}

impl LoadJob {
    pub fn new(
        task_id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        table_name: impl Into<String>,
        connection_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            source_path: source_path.into(),
            table_name: table_name.into(),
            connection_id: connection_id.into(),
        }
    }
}

/// Statistics for a single load invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStats {
    pub table_name: String,
    pub rows_extracted: usize,
    pub rows_loaded: usize,
    pub columns: Vec<String>,
    pub processing_time_ms: u128,
}

impl LoadStats {
    /// Rows removed by transform rules (missing ids, duplicates, bad values)
    pub fn rows_dropped(&self) -> usize {
        self.rows_extracted.saturating_sub(self.rows_loaded)
    }
}

/// Result of one task within a pipeline run
#[derive(Debug)]
pub struct TaskOutcome {
    pub task_id: String,
    pub table_name: String,
    pub attempts: u32,
    pub result: Result<LoadStats, LoaderError>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summary of a whole pipeline run
#[derive(Debug)]
pub struct RunSummary {
    pub dag_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcomes: Vec<TaskOutcome>,
}

impl RunSummary {
    /// Whether every task succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_success)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Total rows written across successful tasks
    pub fn total_rows_loaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|stats| stats.rows_loaded)
            .sum()
    }

    /// Outcome for a given task id
    pub fn outcome(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.task_id == task_id)
    }
}
