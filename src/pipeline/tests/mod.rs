//! Scenario tests for the pipeline runner
//!
//! Each test builds a scratch directory with CSV sources and a SQLite
//! warehouse, then runs the pipeline against it.

pub mod end_to_end;

use crate::config::{ConnectionConfig, PipelineConfig, PipelineSettings, TaskConfig};
use crate::sink::ConnectionKind;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Connection id used by every scenario
pub const WAREHOUSE: &str = "warehouse";

/// Write a CSV source into the scratch directory
pub fn write_source(temp_dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Path of the scratch SQLite warehouse
pub fn warehouse_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("warehouse.db")
}

/// Pipeline configuration loading each (task_id, source, table) into the warehouse
pub fn pipeline_config(temp_dir: &TempDir, tasks: &[(&str, PathBuf, &str)]) -> PipelineConfig {
    let mut config = PipelineConfig {
        pipeline: PipelineSettings {
            default_connection: WAREHOUSE.to_string(),
            ..Default::default()
        }
        .with_max_parallel_tasks(2),
        ..Default::default()
    };

    config.connections.insert(
        WAREHOUSE.to_string(),
        ConnectionConfig {
            kind: ConnectionKind::Sqlite,
            path: warehouse_path(temp_dir),
        },
    );

    config.tasks = tasks
        .iter()
        .map(|(task_id, source, table)| TaskConfig {
            task_id: task_id.to_string(),
            source: source.clone(),
            table: table.to_string(),
            connection: None,
        })
        .collect();

    config
}
