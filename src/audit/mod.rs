// SPDX-License-Identifier: MIT
//! Run orchestrator — executes the check catalog in order, reconciles each
//! result set against the check's exclusions, and accumulates findings and
//! errors as a value returned from the run.
//!
//! Per-check terminal states:
//! - **Clean** — query succeeded, zero rows.
//! - **AllExcluded** — rows returned, every one a known false positive.
//! - **Anomaly** — at least one row survived filtering (a [`Finding`]).
//! - **Failed** — the query raised a data-access fault; the run continues.

pub mod matcher;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{Check, CheckRepository};
use crate::error::{AuditError, MalformedExclusionError};
use crate::executor::{QueryExecutor, ResultRow};
use self::matcher::{is_excluded, parse_exclusion, ExclusionFields};

/// A check's surviving anomalous rows, in original result order.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub category: String,
    pub topic: String,
    pub rows: Vec<ResultRow>,
}

/// A check whose query could not be executed.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionError {
    pub category: String,
    pub topic: String,
    pub query: String,
    pub message: String,
}

/// A check whose every raw row matched an exclusion — distinct from a clean
/// check (no rows at all) and from a genuine finding.
#[derive(Debug, Clone, Serialize)]
pub struct AllExcluded {
    pub category: String,
    pub topic: String,
    /// Number of raw rows that were filtered out.
    pub excluded_rows: usize,
}

/// Terminal state of one check.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Clean,
    AllExcluded { excluded_rows: usize },
    Anomaly(Finding),
    Failed(ExecutionError),
}

/// Everything one run accumulated, in catalog order.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub findings: Vec<Finding>,
    pub errors: Vec<ExecutionError>,
    pub all_excluded: Vec<AllExcluded>,
    /// Malformed exclusion documents encountered while filtering.
    pub config_errors: Vec<MalformedExclusionError>,
    pub checks_run: usize,
}

/// Runs the check catalog sequentially over a shared database connection.
///
/// Sequential execution is deliberate: the connection is a single shared
/// resource, and findings/errors must come out in catalog order.
pub struct AuditRunner {
    executor: Arc<dyn QueryExecutor>,
}

impl AuditRunner {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Load the catalog from `repository` and run it. A repository failure is
    /// fatal and aborts before any check executes — no partial outcome.
    pub async fn run_catalog(
        &self,
        repository: &dyn CheckRepository,
    ) -> Result<RunOutcome, AuditError> {
        let checks = repository
            .find_all_checks()
            .await
            .map_err(AuditError::Catalog)?;
        info!("found {} checks", checks.len());
        Ok(self.run(&checks).await)
    }

    /// Execute `checks` in order. Per-check faults become data in the
    /// outcome; nothing here aborts the run.
    pub async fn run(&self, checks: &[Check]) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        let mut prev_category: Option<&str> = None;

        for check in checks {
            // Log a section marker at each category boundary.
            if prev_category != Some(check.category.as_str()) {
                info!(" ========== Category = {} ========== ", check.category);
                prev_category = Some(check.category.as_str());
            }

            let (check_outcome, mut config_errors) = self.run_check(check).await;
            outcome.config_errors.append(&mut config_errors);
            outcome.checks_run += 1;

            match check_outcome {
                CheckOutcome::Clean => {}
                CheckOutcome::AllExcluded { excluded_rows } => {
                    outcome.all_excluded.push(AllExcluded {
                        category: check.category.clone(),
                        topic: check.topic.clone(),
                        excluded_rows,
                    });
                }
                CheckOutcome::Anomaly(finding) => outcome.findings.push(finding),
                CheckOutcome::Failed(error) => outcome.errors.push(error),
            }
        }

        outcome
    }

    /// Execute a single check and classify its result set.
    ///
    /// Returned alongside the outcome are any malformed exclusion documents
    /// encountered — each is skipped (remaining exclusions still apply) and
    /// reported as a config error rather than silently ignored.
    pub async fn run_check(&self, check: &Check) -> (CheckOutcome, Vec<MalformedExclusionError>) {
        info!(" ===== {} ===== ", check.topic);
        info!("{}", check.query);

        let rows = match self.executor.execute(&check.query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("could not execute the query {}: {}", check.query, e.message);
                return (
                    CheckOutcome::Failed(ExecutionError {
                        category: check.category.clone(),
                        topic: check.topic.clone(),
                        query: e.query,
                        message: e.message,
                    }),
                    Vec::new(),
                );
            }
        };

        if rows.is_empty() {
            return (CheckOutcome::Clean, Vec::new());
        }

        // Exclusions are deserialized at match time, once per check per run.
        let (exclusions, config_errors) = parse_exclusions(check);

        let raw_count = rows.len();
        let surviving: Vec<ResultRow> = rows
            .into_iter()
            .filter(|row| !is_excluded(row, &exclusions))
            .collect();

        if surviving.is_empty() {
            info!("all results are known false positives for {}", check.topic);
            return (
                CheckOutcome::AllExcluded {
                    excluded_rows: raw_count,
                },
                config_errors,
            );
        }

        info!("* found {} results for {}", surviving.len(), check.topic);
        (
            CheckOutcome::Anomaly(Finding {
                category: check.category.clone(),
                topic: check.topic.clone(),
                rows: surviving,
            }),
            config_errors,
        )
    }
}

/// Parse a check's exclusion documents once, skipping malformed ones.
fn parse_exclusions(check: &Check) -> (Vec<ExclusionFields>, Vec<MalformedExclusionError>) {
    let mut parsed = Vec::with_capacity(check.exclusions.len());
    let mut errors = Vec::new();
    for exclusion in &check.exclusions {
        match parse_exclusion(&check.topic, exclusion) {
            Ok(fields) => parsed.push(fields),
            Err(e) => {
                warn!("{e}");
                errors.push(e);
            }
        }
    }
    (parsed, errors)
}
