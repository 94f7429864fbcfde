//! Repository and executor tests against a real SQLite database.

use sqlx::SqlitePool;
use tempfile::TempDir;

use dbaudit::catalog::{CheckRepository, SqlCheckRepository};
use dbaudit::executor::{QueryExecutor, SqliteQueryExecutor, NULL_SENTINEL};

/// Open a file-backed SQLite pool inside `dir` (`:memory:` gives every pool
/// connection its own database, so tests use a shared file instead).
async fn open_pool(dir: &TempDir) -> SqlitePool {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    SqlitePool::connect(&url).await.unwrap()
}

async fn seed_catalog(repo: &SqlCheckRepository) {
    let pool = repo.pool();
    // Inserted in non-catalog order on purpose.
    for (id, category, topic, query) in [
        (3i64, "Results", "Orphan results", "SELECT 3"),
        (1, "Persons", "Missing country", "SELECT 1"),
        (2, "Persons", "Duplicate id", "SELECT 2"),
    ] {
        sqlx::query("INSERT INTO sanity_checks (id, category, topic, query) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(category)
            .bind(topic)
            .bind(query)
            .execute(&pool)
            .await
            .unwrap();
    }
    sqlx::query(
        "INSERT INTO sanity_check_exclusions (check_id, exclusion) VALUES (?, ?), (?, ?)",
    )
    .bind(1i64)
    .bind(r#"{"country":"Brazil"}"#)
    .bind(3i64)
    .bind(r#"{"id":"5"}"#)
    .execute(&pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_repository_orders_by_category_topic_id() {
    let dir = TempDir::new().unwrap();
    let repo = SqlCheckRepository::from_pool(open_pool(&dir).await)
        .await
        .unwrap();
    seed_catalog(&repo).await;

    let checks = repo.find_all_checks().await.unwrap();
    let topics: Vec<&str> = checks.iter().map(|c| c.topic.as_str()).collect();
    assert_eq!(
        topics,
        ["Duplicate id", "Missing country", "Orphan results"]
    );
}

#[tokio::test]
async fn test_repository_attaches_exclusions_to_their_check() {
    let dir = TempDir::new().unwrap();
    let repo = SqlCheckRepository::from_pool(open_pool(&dir).await)
        .await
        .unwrap();
    seed_catalog(&repo).await;

    let checks = repo.find_all_checks().await.unwrap();
    let missing_country = checks.iter().find(|c| c.id == 1).unwrap();
    assert_eq!(missing_country.exclusions.len(), 1);
    assert_eq!(missing_country.exclusions[0].raw, r#"{"country":"Brazil"}"#);
    let duplicate_id = checks.iter().find(|c| c.id == 2).unwrap();
    assert!(duplicate_id.exclusions.is_empty());
}

#[tokio::test]
async fn test_executor_materializes_types_and_order() {
    let dir = TempDir::new().unwrap();
    let pool = open_pool(&dir).await;
    sqlx::query(
        "CREATE TABLE t (name TEXT, age INTEGER, score REAL, photo BLOB, deleted_at TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO t VALUES ('Ada', 36, 99.5, x'c0ffee', NULL)")
        .execute(&pool)
        .await
        .unwrap();

    let executor = SqliteQueryExecutor::new(pool);
    let rows = executor
        .execute("SELECT name, age, score, photo, deleted_at FROM t")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let pairs: Vec<(&str, &str)> = rows[0].columns().collect();
    assert_eq!(
        pairs,
        [
            ("name", "Ada"),
            ("age", "36"),
            ("score", "99.5"),
            ("photo", "c0ffee"),
            ("deleted_at", NULL_SENTINEL),
        ]
    );
}

#[tokio::test]
async fn test_executor_empty_result_set() {
    let dir = TempDir::new().unwrap();
    let pool = open_pool(&dir).await;
    sqlx::query("CREATE TABLE t (id INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    let executor = SqliteQueryExecutor::new(pool);
    let rows = executor.execute("SELECT id FROM t").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_executor_reports_query_fault_with_query_text() {
    let dir = TempDir::new().unwrap();
    let executor = SqliteQueryExecutor::new(open_pool(&dir).await);

    let err = executor
        .execute("SELECT * FROM a INNER JOIN b ON")
        .await
        .unwrap_err();
    assert_eq!(err.query, "SELECT * FROM a INNER JOIN b ON");
    assert!(!err.message.is_empty());
}
