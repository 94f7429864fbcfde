// SPDX-License-Identifier: MIT
//! Error taxonomy for the audit engine.
//!
//! Per-check and per-exclusion faults are recoverable and become data in the
//! run outcome; only catalog load and notification delivery surface as errors.

/// A check's query could not be executed (malformed SQL, broken connection,
/// permission fault). Recoverable: recorded against the check, run continues.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not execute the query `{query}`: {message}")]
pub struct QueryError {
    /// The query text that failed, verbatim.
    pub query: String,
    /// Message from the underlying database driver.
    pub message: String,
}

impl QueryError {
    pub fn new(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            message: message.into(),
        }
    }
}

/// A stored exclusion document could not be parsed into column/value pairs.
/// Recoverable: that exclusion is skipped, the check's remaining exclusions
/// and rows are still processed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed exclusion {exclusion_id} for check `{topic}`: {message}")]
pub struct MalformedExclusionError {
    /// Topic of the check the exclusion belongs to.
    pub topic: String,
    /// Catalog id of the offending exclusion row.
    pub exclusion_id: i64,
    pub message: String,
}

/// Fatal faults of a whole run. A run that fails with one of these produces
/// no partial report.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The check catalog could not be loaded. Aborts before any check runs.
    #[error("failed to load check catalog: {0:#}")]
    Catalog(anyhow::Error),

    /// Report delivery failed. The report was produced; only delivery is lost.
    #[error("failed to deliver report: {0:#}")]
    Notification(anyhow::Error),
}
