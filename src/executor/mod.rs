// SPDX-License-Identifier: MIT
//! Check executor — runs one check's query and materializes the result set
//! into ordered string rows.
//!
//! The rest of the engine never sees a driver row type: every column value is
//! flattened to its string form here, with SQL NULL mapped to a sentinel
//! distinct from the empty string.

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};

use crate::error::QueryError;

/// String form of SQL NULL in a [`ResultRow`]. Distinct from `""` so an
/// exclusion can target empty strings and nulls separately.
pub const NULL_SENTINEL: &str = "NULL";

/// One returned database row: `(column, value)` pairs in the result
/// metadata's column order, every value in string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    columns: Vec<(String, String)>,
}

impl ResultRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of the named column, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// `(column, value)` pairs in result order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `col=value, col=value` — the form used in log lines and the report
    /// text body.
    pub fn render(&self) -> String {
        self.columns
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// Serialized as a JSON object, preserving column order.
impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (k, v) in &self.columns {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Executes one query text verbatim against the audited database.
///
/// One attempt per call — retry policy belongs to the external scheduler, not
/// here. A data-access fault is returned as [`QueryError`] and never aborts
/// the run.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, QueryError>;
}

// ─── SQLite executor ─────────────────────────────────────────────────────────

/// [`QueryExecutor`] over an sqlx SQLite pool.
#[derive(Clone)]
pub struct SqliteQueryExecutor {
    pool: SqlitePool,
}

impl SqliteQueryExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for SqliteQueryExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<ResultRow>, QueryError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueryError::new(sql, e.to_string()))?;

        rows.iter()
            .map(|row| flatten_row(row).map_err(|e| QueryError::new(sql, e.to_string())))
            .collect()
    }
}

/// Flatten a driver row into string columns, preserving ordinal order.
fn flatten_row(row: &SqliteRow) -> Result<ResultRow, sqlx::Error> {
    let mut columns = Vec::with_capacity(row.len());
    for (i, col) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            NULL_SENTINEL.to_string()
        } else {
            // SQLite storage classes: TEXT, INTEGER, REAL, BLOB (plus NULL,
            // handled above). Declared types like BOOLEAN and DATETIME decode
            // through their storage class.
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(i)?.to_string(),
                "REAL" => row.try_get_unchecked::<f64, _>(i)?.to_string(),
                "BLOB" => hex::encode(row.try_get_unchecked::<Vec<u8>, _>(i)?),
                _ => row.try_get_unchecked::<String, _>(i)?,
            }
        };
        columns.push((col.name().to_string(), value));
    }
    Ok(ResultRow { columns })
}
