//! Seed catalog operations

use seedling_common::time::parse_rfc3339;
use seedling_common::Result;
use sqlx::{Row, SqlitePool};

use crate::models::Seed;
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

/// Insert or update a catalog entry
///
/// Re-registering keeps the original `registered_at`.
pub async fn upsert_seed(pool: &SqlitePool, seed: &Seed) -> Result<Seed> {
    let registered_at = seed.registered_at.to_rfc3339();

    retry_on_lock("upsert_seed", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO seeds (
                seed_id, title, description, estimated_participants, estimated_duration,
                registered_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(seed_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                estimated_participants = excluded.estimated_participants,
                estimated_duration = excluded.estimated_duration
            "#,
        )
        .bind(&seed.seed_id)
        .bind(&seed.title)
        .bind(&seed.description)
        .bind(seed.estimated_participants)
        .bind(seed.estimated_duration)
        .bind(&registered_at)
        .execute(pool)
        .await?;

        Ok(())
    })
    .await?;

    get_seed(pool, &seed.seed_id).await?.ok_or_else(|| {
        seedling_common::Error::Internal(format!("Seed {} missing after upsert", seed.seed_id))
    })
}

pub async fn get_seed(pool: &SqlitePool, seed_id: &str) -> Result<Option<Seed>> {
    let row = sqlx::query(
        r#"
        SELECT seed_id, title, description, estimated_participants, estimated_duration,
               registered_at
        FROM seeds WHERE seed_id = ?
        "#,
    )
    .bind(seed_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let registered_at: String = row.get("registered_at");
    Ok(Some(Seed {
        seed_id: row.get("seed_id"),
        title: row.get("title"),
        description: row.get("description"),
        estimated_participants: row.get("estimated_participants"),
        estimated_duration: row.get("estimated_duration"),
        registered_at: parse_rfc3339(&registered_at)?,
    }))
}
