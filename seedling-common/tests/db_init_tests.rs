//! Database initialization tests

use seedling_common::db::{init_database, init_memory_database};
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_missing_database_and_parents() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("seedling.db");

    let pool = init_database(&db_path).await.expect("database should open");
    assert!(db_path.exists(), "database file should be created");

    let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.0.to_lowercase(), "wal");

    pool.close().await;
}

#[tokio::test]
async fn test_init_reopens_existing_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("seedling.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("CREATE TABLE marker (id INTEGER PRIMARY KEY)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'marker'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1, "existing tables should survive reopen");
}

#[tokio::test]
async fn test_memory_database_enforces_foreign_keys() {
    let pool = init_memory_database().await.unwrap();

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}
