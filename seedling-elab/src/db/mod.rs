//! Database access for seedling-elab
//!
//! Tables: `seeds` (local catalog), `elaboration_sessions` (one row per
//! session, no metadata column) and `elaboration_turns` (append-only answer
//! history, the source of truth for metadata).

pub mod seeds;
pub mod sessions;

use seedling_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the service database and create tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = seedling_common::db::init_database(db_path).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create seedling-elab tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS seeds (
            seed_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            estimated_participants INTEGER,
            estimated_duration INTEGER,
            registered_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elaboration_sessions (
            session_id TEXT PRIMARY KEY,
            seed_id TEXT NOT NULL REFERENCES seeds(seed_id),
            state TEXT NOT NULL CHECK (state IN ('ACTIVE', 'COMPLETE', 'ABANDONED')),
            current_field TEXT,
            current_question TEXT,
            started_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            ended_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one ACTIVE session per seed
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_elaboration_sessions_active_seed
        ON elaboration_sessions(seed_id) WHERE state = 'ACTIVE'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_elaboration_sessions_seed ON elaboration_sessions(seed_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elaboration_turns (
            session_id TEXT NOT NULL REFERENCES elaboration_sessions(session_id),
            seq INTEGER NOT NULL,
            field TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            delta TEXT NOT NULL DEFAULT '{}',
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (session_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (seeds, elaboration_sessions, elaboration_turns)");

    Ok(())
}
