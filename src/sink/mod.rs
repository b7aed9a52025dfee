//! Destination tables.
//!
//! A [`TableSink`] writes a whole DataFrame into a named table. Connections
//! are looked up by identifier in a [`ConnectionRegistry`], so tasks only ever
//! carry a connection id and never hold connection details themselves.

pub mod sqlite;

use crate::config::ConnectionConfig;
use crate::constants::TABLE_NAME_PATTERN;
use crate::error::{LoaderError, Result};
use polars::prelude::DataFrame;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::debug;

pub use sqlite::SqliteSink;

/// How a write treats existing table contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Discard the previous contents and schema entirely
    #[default]
    Replace,
}

/// Supported destination stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Sqlite,
}

/// Writes DataFrames into destination tables
pub trait TableSink {
    /// Write `df` into `table`, returning the number of rows written
    fn write_table(&mut self, table: &str, df: &DataFrame, mode: WriteMode) -> Result<usize>;
}

/// Resolved connection details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: String,
    pub kind: ConnectionKind,
    pub path: PathBuf,
}

impl ConnectionHandle {
    pub fn sqlite(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            kind: ConnectionKind::Sqlite,
            path: path.into(),
        }
    }

    /// Open a fresh sink for this connection
    pub fn open(&self) -> Result<Box<dyn TableSink>> {
        debug!("Opening {:?} connection '{}'", self.kind, self.id);
        match self.kind {
            ConnectionKind::Sqlite => Ok(Box::new(SqliteSink::open(&self.path)?)),
        }
    }
}

/// Lookup table from connection id to connection details
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[connections]` section of a pipeline file
    pub fn from_config(connections: &BTreeMap<String, ConnectionConfig>) -> Self {
        let mut registry = Self::new();
        for (id, config) in connections {
            registry.register(ConnectionHandle {
                id: id.clone(),
                kind: config.kind,
                path: config.path.clone(),
            });
        }
        registry
    }

    /// Add or replace a connection
    pub fn register(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.id.clone(), handle);
    }

    /// Look up a connection by id
    pub fn resolve(&self, id: &str) -> Result<ConnectionHandle> {
        self.connections
            .get(id)
            .cloned()
            .ok_or_else(|| LoaderError::ConnectionNotFound { id: id.to_string() })
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Reject table names that are not plain identifiers
pub fn validate_table_name(name: &str) -> Result<()> {
    let pattern = Regex::new(TABLE_NAME_PATTERN)
        .map_err(|e| LoaderError::configuration(format!("invalid table pattern: {}", e)))?;

    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(LoaderError::configuration(format!(
            "invalid table name '{}': expected letters, digits and underscores",
            name
        )))
    }
}

/// Quote an identifier for use in SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
