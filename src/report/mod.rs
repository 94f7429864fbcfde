// SPDX-License-Identifier: MIT
//! Report assembler — shapes one run's accumulated outcome into the structure
//! handed to the notifier. Pure data shaping: nothing here re-filters or
//! mutates findings.

use chrono::Utc;
use serde::Serialize;

use crate::audit::{AllExcluded, ExecutionError, Finding, RunOutcome};

/// Derived counts for the report header.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub checks_run: usize,
    pub findings: usize,
    /// Total surviving rows across all findings.
    pub anomalous_rows: usize,
    pub errors: usize,
    pub all_excluded: usize,
    pub config_errors: usize,
}

/// Aggregate of one audit run, consumed by the notifier.
#[derive(Debug, Serialize)]
pub struct AuditReport {
    /// ISO-8601 timestamp when the report was assembled.
    pub generated_at: String,
    pub summary: ReportSummary,
    pub has_anomalies: bool,
    pub findings: Vec<Finding>,
    pub errors: Vec<ExecutionError>,
    /// Checks whose every raw row was a known false positive.
    pub all_excluded: Vec<AllExcluded>,
    /// Malformed exclusion documents, rendered as messages.
    pub config_errors: Vec<String>,
}

/// Build the final report from a run's outcome. Findings and errors keep the
/// catalog order they were accumulated in.
pub fn assemble(outcome: RunOutcome) -> AuditReport {
    let anomalous_rows = outcome.findings.iter().map(|f| f.rows.len()).sum();
    let summary = ReportSummary {
        checks_run: outcome.checks_run,
        findings: outcome.findings.len(),
        anomalous_rows,
        errors: outcome.errors.len(),
        all_excluded: outcome.all_excluded.len(),
        config_errors: outcome.config_errors.len(),
    };

    AuditReport {
        generated_at: Utc::now().to_rfc3339(),
        has_anomalies: !outcome.findings.is_empty(),
        summary,
        findings: outcome.findings,
        errors: outcome.errors,
        all_excluded: outcome.all_excluded,
        config_errors: outcome.config_errors.iter().map(|e| e.to_string()).collect(),
    }
}

impl AuditReport {
    /// Human-readable body used by the notifier and the CLI.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "Sanity check: {} checks run, {} findings ({} rows), {} failed queries\n",
            self.summary.checks_run,
            self.summary.findings,
            self.summary.anomalous_rows,
            self.summary.errors,
        ));

        for finding in &self.findings {
            out.push_str(&format!(
                "\n** Inconsistency at [{}] {}\n",
                finding.category, finding.topic
            ));
            for row in &finding.rows {
                out.push_str(&row.render());
                out.push('\n');
            }
        }

        if !self.errors.is_empty() {
            out.push_str("\nQueries with error:\n");
            for error in &self.errors {
                out.push_str(&format!(
                    "[{}] {}: {}\n    {}\n",
                    error.category, error.topic, error.message, error.query
                ));
            }
        }

        if !self.all_excluded.is_empty() {
            out.push_str("\nAll results known false positives:\n");
            for entry in &self.all_excluded {
                out.push_str(&format!(
                    "[{}] {} ({} rows)\n",
                    entry.category, entry.topic, entry.excluded_rows
                ));
            }
        }

        if !self.config_errors.is_empty() {
            out.push_str("\nConfiguration errors:\n");
            for message in &self.config_errors {
                out.push_str(message);
                out.push('\n');
            }
        }

        out
    }
}
