//! SQLite destination.
//!
//! Replacement is done as a table swap: rows go into a staging table first,
//! then the old table is dropped and the staging table renamed, all inside
//! one transaction. Readers see either the old table or the complete new one.

use super::{TableSink, WriteMode, quote_identifier, validate_table_name};
use crate::constants::STAGING_TABLE_SUFFIX;
use crate::error::{LoaderError, Result};
use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed table sink
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSink {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> Result<Self> {
        let target = path.display().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LoaderError::write(&target, e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| LoaderError::write(&target, e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| LoaderError::write(&target, e.to_string()))?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a table with this name exists
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| LoaderError::write(table, e.to_string()))?;
        Ok(count > 0)
    }

    /// Column names and declared types, in table order
    pub fn table_schema(&self, table: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))
            .map_err(|e| LoaderError::write(table, e.to_string()))?;

        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| LoaderError::write(table, e.to_string()))?;
        Ok(columns)
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| LoaderError::write(table, e.to_string()))?;
        Ok(count as usize)
    }

    /// Every row of a table in insertion order
    pub fn read_rows(&self, table: &str) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT * FROM {} ORDER BY rowid",
                quote_identifier(table)
            ))
            .map_err(|e| LoaderError::write(table, e.to_string()))?;
        let width = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| LoaderError::write(table, e.to_string()))?;
        Ok(rows)
    }

    fn replace_table(&mut self, table: &str, df: &DataFrame) -> Result<usize> {
        let staging_name = staging_table_name(table);
        self.swap_in(table, &staging_name, df)
    }

    /// Stage `df` under `staging_name` and rename it over `table`.
    ///
    /// Fails without touching anything if `staging_name` is already taken.
    fn swap_in(&mut self, table: &str, staging_name: &str, df: &DataFrame) -> Result<usize> {
        let columns = df.get_columns();
        if columns.is_empty() {
            return Err(LoaderError::write(table, "dataset has no columns"));
        }

        let to_write_error = |e: rusqlite::Error| LoaderError::write(table, e.to_string());

        let staging = quote_identifier(staging_name);
        let target = quote_identifier(table);
        let definitions = columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}",
                    quote_identifier(column.name()),
                    sql_type(column.dtype())
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction().map_err(to_write_error)?;

        let staging_taken: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = ?1)",
                [staging_name],
                |row| row.get(0),
            )
            .map_err(to_write_error)?;
        if staging_taken {
            return Err(LoaderError::write(
                table,
                format!("staging table '{}' already exists", staging_name),
            ));
        }

        tx.execute_batch(&format!("CREATE TABLE {staging} ({definitions});"))
            .map_err(to_write_error)?;

        {
            let mut insert = tx
                .prepare(&format!("INSERT INTO {staging} VALUES ({placeholders})"))
                .map_err(to_write_error)?;

            for row in 0..df.height() {
                let values = columns
                    .iter()
                    .map(|column| column.get(row).map(to_sql_value))
                    .collect::<PolarsResult<Vec<_>>>()?;
                insert
                    .execute(params_from_iter(values))
                    .map_err(to_write_error)?;
            }
        }

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {target}; ALTER TABLE {staging} RENAME TO {target};"
        ))
        .map_err(to_write_error)?;
        tx.commit().map_err(to_write_error)?;

        debug!(
            "Swapped {} rows into {} ({})",
            df.height(),
            table,
            self.path.display()
        );
        Ok(df.height())
    }
}

impl TableSink for SqliteSink {
    fn write_table(&mut self, table: &str, df: &DataFrame, mode: WriteMode) -> Result<usize> {
        validate_table_name(table)?;
        match mode {
            WriteMode::Replace => self.replace_table(table, df),
        }
    }
}

/// Scratch table name for one swap, unique per process and write
fn staging_table_name(table: &str) -> String {
    static NEXT_SWAP: AtomicU64 = AtomicU64::new(0);
    let swap = NEXT_SWAP.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}{}_{}_{}",
        table,
        STAGING_TABLE_SUFFIX,
        std::process::id(),
        swap
    )
}

/// Declared SQLite column type for a polars dtype
fn sql_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean => "INTEGER",
        dtype if dtype.is_integer() => "INTEGER",
        dtype if dtype.is_float() => "REAL",
        _ => "TEXT",
    }
}

fn to_sql_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Integer(i64::from(v)),
        AnyValue::Int32(v) => Value::Integer(i64::from(v)),
        AnyValue::Int64(v) => Value::Integer(v),
        AnyValue::UInt32(v) => Value::Integer(i64::from(v)),
        AnyValue::UInt64(v) => match i64::try_from(v) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::Real(v as f64),
        },
        AnyValue::Float32(v) => Value::Real(f64::from(v)),
        AnyValue::Float64(v) => Value::Real(v),
        AnyValue::String(v) => Value::Text(v.to_string()),
        AnyValue::StringOwned(v) => Value::Text(v.to_string()),
        other => Value::Text(other.to_string()),
    }
}
