//! Runtime configuration: a TOML file as the lowest-priority layer, CLI
//! flags and environment variables on top (flags win, clap handles the env
//! layer).

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::error;

const DEFAULT_DATABASE_URL: &str = "sqlite://audit.db";
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

// ─── NotifyConfig ────────────────────────────────────────────────────────────

/// Report delivery configuration (`[notify]` in the config file).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook URL to POST the report to. None = log-only delivery.
    pub webhook_url: Option<String>,
    /// Request timeout for the webhook POST, in seconds. Default: 10.
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
        }
    }
}

// ─── File layer ──────────────────────────────────────────────────────────────

/// Raw shape of the TOML config file. All fields optional — anything absent
/// falls back to flags or defaults.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    database_url: Option<String>,
    catalog_url: Option<String>,
    log: Option<String>,
    #[serde(default)]
    notify: NotifyConfig,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config file — using defaults");
            None
        }
    }
}

// ─── AuditConfig ─────────────────────────────────────────────────────────────

/// Resolved configuration for one audit run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Connection URL of the audited database.
    pub database_url: String,
    /// Connection URL of the check catalog. Defaults to `database_url`.
    pub catalog_url: String,
    /// Log level filter (trace, debug, info, warn, error).
    pub log: String,
    pub notify: NotifyConfig,
}

impl AuditConfig {
    /// Resolve config from an optional file plus flag overrides.
    /// Flags beat the file; the file beats defaults.
    pub fn new(
        config_file: Option<&Path>,
        database_url: Option<String>,
        catalog_url: Option<String>,
        log: Option<String>,
    ) -> Self {
        let toml = config_file.and_then(load_toml).unwrap_or_default();

        let database_url = database_url
            .or(toml.database_url)
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let catalog_url = catalog_url
            .or(toml.catalog_url)
            .unwrap_or_else(|| database_url.clone());
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        Self {
            database_url,
            catalog_url,
            log,
            notify: toml.notify,
        }
    }
}
