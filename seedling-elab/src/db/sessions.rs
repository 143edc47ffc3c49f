//! Elaboration session persistence
//!
//! Only the session row and its answer history are stored. Metadata is
//! rebuilt by replaying history deltas whenever a session is loaded, and
//! completeness is always recomputed.

use seedling_common::time::parse_rfc3339;
use seedling_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{ElaborationSession, HistoryEntry, Metadata, SessionState};
use crate::utils::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

const SESSION_COLUMNS: &str = "session_id, seed_id, state, current_field, current_question, \
                               started_at, updated_at, ended_at";

/// Insert a newly created session
pub async fn insert_session(pool: &SqlitePool, session: &ElaborationSession) -> Result<()> {
    let session_id = session.session_id.to_string();
    let started_at = session.started_at.to_rfc3339();
    let updated_at = session.updated_at.to_rfc3339();
    let ended_at = session.ended_at.map(|dt| dt.to_rfc3339());

    retry_on_lock("insert_session", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO elaboration_sessions (
                session_id, seed_id, state, current_field, current_question,
                started_at, updated_at, ended_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session_id)
        .bind(&session.seed_id)
        .bind(session.state.as_str())
        .bind(&session.current_field)
        .bind(&session.current_question)
        .bind(&started_at)
        .bind(&updated_at)
        .bind(&ended_at)
        .execute(pool)
        .await?;

        Ok(())
    })
    .await
}

/// Persist the newest history entry together with the session row
///
/// Both writes share one transaction: either the answer and the advanced
/// session state are stored, or neither is.
pub async fn append_turn(pool: &SqlitePool, session: &ElaborationSession) -> Result<()> {
    let entry = session
        .history()
        .last()
        .ok_or_else(|| Error::Internal("append_turn called with empty history".to_string()))?;

    let session_id = session.session_id.to_string();
    let seq = (session.history().len() - 1) as i64;
    let delta = serde_json::to_string(&entry.delta)
        .map_err(|e| Error::Internal(format!("Failed to serialize delta: {}", e)))?;
    let recorded_at = entry.recorded_at.to_rfc3339();
    let updated_at = session.updated_at.to_rfc3339();
    let ended_at = session.ended_at.map(|dt| dt.to_rfc3339());

    retry_on_lock("append_turn", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO elaboration_turns (
                session_id, seq, field, question, answer, delta, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session_id)
        .bind(seq)
        .bind(&entry.field)
        .bind(&entry.question)
        .bind(&entry.answer)
        .bind(&delta)
        .bind(&recorded_at)
        .execute(&mut *tx)
        .await?;

        update_row(&mut tx, &session_id, session, &updated_at, &ended_at).await?;

        tx.commit().await?;
        Ok(())
    })
    .await
}

/// Persist a state change that adds no history (abandon)
pub async fn update_session(pool: &SqlitePool, session: &ElaborationSession) -> Result<()> {
    let session_id = session.session_id.to_string();
    let updated_at = session.updated_at.to_rfc3339();
    let ended_at = session.ended_at.map(|dt| dt.to_rfc3339());

    retry_on_lock("update_session", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let mut tx = pool.begin().await?;
        update_row(&mut tx, &session_id, session, &updated_at, &ended_at).await?;
        tx.commit().await?;
        Ok(())
    })
    .await
}

async fn update_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    session_id: &str,
    session: &ElaborationSession,
    updated_at: &str,
    ended_at: &Option<String>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE elaboration_sessions
        SET state = ?, current_field = ?, current_question = ?, updated_at = ?, ended_at = ?
        WHERE session_id = ?
        "#,
    )
    .bind(session.state.as_str())
    .bind(&session.current_field)
    .bind(&session.current_question)
    .bind(updated_at)
    .bind(ended_at)
    .bind(session_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Session {}", session_id)));
    }

    Ok(())
}

/// Load a session with its history
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<ElaborationSession>> {
    let sql = format!(
        "SELECT {} FROM elaboration_sessions WHERE session_id = ?",
        SESSION_COLUMNS
    );
    fetch_session(pool, &sql, &session_id.to_string()).await
}

/// The seed's ACTIVE session, if any
pub async fn find_active(pool: &SqlitePool, seed_id: &str) -> Result<Option<ElaborationSession>> {
    let sql = format!(
        "SELECT {} FROM elaboration_sessions WHERE seed_id = ? AND state = 'ACTIVE'",
        SESSION_COLUMNS
    );
    fetch_session(pool, &sql, seed_id).await
}

/// The session status reporting uses: the ACTIVE one, else the most
/// recently created terminal one
pub async fn latest_for_seed(pool: &SqlitePool, seed_id: &str) -> Result<Option<ElaborationSession>> {
    let sql = format!(
        r#"
        SELECT {} FROM elaboration_sessions
        WHERE seed_id = ?
        ORDER BY (state = 'ACTIVE') DESC, rowid DESC
        LIMIT 1
        "#,
        SESSION_COLUMNS
    );
    fetch_session(pool, &sql, seed_id).await
}

/// History entries for a session in answer order
pub async fn load_history<'e, E>(executor: E, session_id: &str) -> Result<Vec<HistoryEntry>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT field, question, answer, delta, recorded_at
        FROM elaboration_turns
        WHERE session_id = ?
        ORDER BY seq
        "#,
    )
    .bind(session_id)
    .fetch_all(executor)
    .await?;

    let mut history = Vec::with_capacity(rows.len());
    for row in rows {
        let delta: String = row.get("delta");
        let delta: Metadata = serde_json::from_str(&delta)
            .map_err(|e| Error::Internal(format!("Failed to deserialize delta: {}", e)))?;
        let recorded_at: String = row.get("recorded_at");

        history.push(HistoryEntry {
            question: row.get("question"),
            field: row.get("field"),
            answer: row.get("answer"),
            delta,
            recorded_at: parse_rfc3339(&recorded_at)?,
        });
    }

    Ok(history)
}

/// Run a single-row session query and load its history from the same
/// read transaction, so row and history come from one snapshot
async fn fetch_session(pool: &SqlitePool, sql: &str, key: &str) -> Result<Option<ElaborationSession>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(sql).bind(key).fetch_optional(&mut *tx).await?;
    let session = match row {
        Some(row) => {
            let session_id: String = row.get("session_id");
            let history = load_history(&mut *tx, &session_id).await?;
            Some(restore(row, history)?)
        }
        None => None,
    };

    tx.commit().await?;
    Ok(session)
}

fn restore(row: SqliteRow, history: Vec<HistoryEntry>) -> Result<ElaborationSession> {
    let session_id: String = row.get("session_id");
    let id = Uuid::parse_str(&session_id)
        .map_err(|e| Error::Internal(format!("Invalid session id '{}': {}", session_id, e)))?;
    let state: String = row.get("state");
    let started_at: String = row.get("started_at");
    let updated_at: String = row.get("updated_at");
    let ended_at: Option<String> = row.get("ended_at");

    Ok(ElaborationSession::restore(
        id,
        row.get("seed_id"),
        state.parse::<SessionState>()?,
        row.get("current_field"),
        row.get("current_question"),
        history,
        parse_rfc3339(&started_at)?,
        parse_rfc3339(&updated_at)?,
        ended_at.as_deref().map(parse_rfc3339).transpose()?,
    ))
}
