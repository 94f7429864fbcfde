use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dbaudit::audit::AuditRunner;
use dbaudit::catalog::{CheckRepository, SqlCheckRepository};
use dbaudit::config::AuditConfig;
use dbaudit::error::AuditError;
use dbaudit::executor::SqliteQueryExecutor;
use dbaudit::notify::{LogNotifier, Notifier, WebhookNotifier};
use dbaudit::report;

#[derive(Parser)]
#[command(
    name = "dbaudit",
    about = "dbaudit — relational database sanity-check runner",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Connection URL of the audited database
    #[arg(long, env = "DBAUDIT_DATABASE_URL")]
    database_url: Option<String>,

    /// Connection URL of the check catalog (defaults to the audited database)
    #[arg(long, env = "DBAUDIT_CATALOG_URL")]
    catalog_url: Option<String>,

    /// Config file path (TOML)
    #[arg(long, env = "DBAUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DBAUDIT_LOG")]
    log: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full check catalog and deliver the report (default).
    ///
    /// Exit code: 0 when clean, 1 when anomalies or failed queries were
    /// found, 2 on fatal error (catalog load or report delivery).
    Run,
    /// List the check catalog.
    Catalog,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = AuditConfig::new(
        args.config.as_deref(),
        args.database_url,
        args.catalog_url,
        args.log,
    );

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let exit_code = match args.command.unwrap_or(Command::Run) {
        Command::Run => runtime.block_on(run(&config))?,
        Command::Catalog => runtime.block_on(list_catalog(&config))?,
    };
    std::process::exit(exit_code);
}

async fn run(config: &AuditConfig) -> Result<i32> {
    info!("database sanity check");

    let repository = match SqlCheckRepository::connect(&config.catalog_url).await {
        Ok(repo) => repo,
        Err(e) => {
            warn!("{:#}", AuditError::Catalog(e));
            return Ok(2);
        }
    };

    // When catalog and audited database share a URL, share the pool too —
    // the run serializes all access anyway.
    let pool = if config.catalog_url == config.database_url {
        repository.pool()
    } else {
        match connect(&config.database_url).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!("{e:#}");
                return Ok(2);
            }
        }
    };

    let runner = AuditRunner::new(Arc::new(SqliteQueryExecutor::new(pool)));
    let outcome = match runner.run_catalog(&repository).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("{e:#}");
            return Ok(2);
        }
    };

    let actionable = !outcome.findings.is_empty() || !outcome.errors.is_empty();
    let report = report::assemble(outcome);

    let notifier: Box<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => match WebhookNotifier::new(
            url.as_str(),
            std::time::Duration::from_secs(config.notify.timeout_secs),
        ) {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                warn!("{:#}", AuditError::Notification(e));
                return Ok(2);
            }
        },
        None => Box::new(LogNotifier),
    };

    if let Err(e) = notifier.deliver(&report).await {
        warn!("{:#}", AuditError::Notification(e));
        return Ok(2);
    }

    info!("sanity check finished");
    Ok(if actionable { 1 } else { 0 })
}

async fn list_catalog(config: &AuditConfig) -> Result<i32> {
    let repository = SqlCheckRepository::connect(&config.catalog_url).await?;
    let checks = repository.find_all_checks().await?;
    for check in &checks {
        println!(
            "[{}] {} ({} exclusions)",
            check.category,
            check.topic,
            check.exclusions.len()
        );
    }
    println!("{} checks", checks.len());
    Ok(0)
}

async fn connect(url: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url: {url}"))?;
    SqlitePool::connect_with(opts)
        .await
        .with_context(|| format!("failed to open database: {url}"))
}
