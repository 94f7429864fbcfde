// SPDX-License-Identifier: MIT
//! Report delivery. One attempt per run — the engine never buffers or
//! resends a report; a delivery failure surfaces to the caller.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::report::AuditReport;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, report: &AuditReport) -> Result<()>;
}

// ─── Webhook notifier ────────────────────────────────────────────────────────

/// Posts the report as JSON to a configured webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, report: &AuditReport) -> Result<()> {
        let payload = json!({
            "generated_at": report.generated_at,
            "has_anomalies": report.has_anomalies,
            "summary": report.summary,
            "findings": report.findings,
            "errors": report.errors,
            "all_excluded": report.all_excluded,
            "config_errors": report.config_errors,
            "text": report.render_text(),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("failed to POST report to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("webhook returned {status} for {}", self.url);
        }

        info!("report delivered to {}", self.url);
        Ok(())
    }
}

// ─── Log notifier ────────────────────────────────────────────────────────────

/// Fallback when no webhook is configured: the rendered report goes to the
/// log and delivery always succeeds.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, report: &AuditReport) -> Result<()> {
        for line in report.render_text().lines() {
            info!("{line}");
        }
        Ok(())
    }
}
