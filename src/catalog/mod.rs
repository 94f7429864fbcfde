// SPDX-License-Identifier: MIT
//! Check catalog — the set of diagnostic queries and their accepted
//! exclusions, loaded from the catalog database once per run.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

/// One accepted false positive, stored as a flat JSON object mapping column
/// name to expected string value. Parsing happens at match time, not here —
/// a malformed document must surface per-check, not fail the catalog load.
#[derive(Debug, Clone)]
pub struct Exclusion {
    /// Catalog row id, used to identify the exclusion in config-error reports.
    pub id: i64,
    /// The stored serialized document, verbatim.
    pub raw: String,
}

/// One diagnostic query. A check that returns rows has found anomalies,
/// unless every row matches one of its exclusions.
#[derive(Debug, Clone)]
pub struct Check {
    pub id: i64,
    pub category: String,
    pub topic: String,
    pub query: String,
    pub exclusions: Vec<Exclusion>,
}

/// Source of the check catalog.
///
/// `find_all_checks` must return checks in a stable order (category, then
/// topic, then id) — the run preserves this order in its output, and callers
/// rely on it.
#[async_trait]
pub trait CheckRepository: Send + Sync {
    async fn find_all_checks(&self) -> Result<Vec<Check>>;
}

// ─── SQLite-backed repository ────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct CheckRow {
    id: i64,
    category: String,
    topic: String,
    query: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ExclusionRow {
    id: i64,
    check_id: i64,
    exclusion: String,
}

/// Check catalog stored in SQLite tables `sanity_checks` and
/// `sanity_check_exclusions` (see `migrations/`).
#[derive(Clone)]
pub struct SqlCheckRepository {
    pool: SqlitePool,
}

impl SqlCheckRepository {
    /// Open (creating if missing) the catalog database at `url` and run
    /// migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid catalog database url: {url}"))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts)
            .await
            .context("failed to open catalog database")?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("src/catalog/migrations")
            .run(&pool)
            .await
            .context("failed to run catalog migrations")?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }
}

#[async_trait]
impl CheckRepository for SqlCheckRepository {
    async fn find_all_checks(&self) -> Result<Vec<Check>> {
        let check_rows: Vec<CheckRow> = sqlx::query_as(
            "SELECT id, category, topic, query FROM sanity_checks \
             ORDER BY category, topic, id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load sanity_checks")?;

        let exclusion_rows: Vec<ExclusionRow> = sqlx::query_as(
            "SELECT id, check_id, exclusion FROM sanity_check_exclusions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load sanity_check_exclusions")?;

        let mut checks: Vec<Check> = check_rows
            .into_iter()
            .map(|r| Check {
                id: r.id,
                category: r.category,
                topic: r.topic,
                query: r.query,
                exclusions: Vec::new(),
            })
            .collect();

        for ex in exclusion_rows {
            if let Some(check) = checks.iter_mut().find(|c| c.id == ex.check_id) {
                check.exclusions.push(Exclusion {
                    id: ex.id,
                    raw: ex.exclusion,
                });
            }
            // Orphan exclusions (check deleted, row left behind) are ignored.
        }

        Ok(checks)
    }
}
