//! Per-user learning metrics documents

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::encode;
use crate::domain::LearningMetrics;

pub fn load_metrics(conn: &Connection, user_id: &str) -> Result<Option<LearningMetrics>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM metrics WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(document) = document else {
        return Ok(None);
    };

    let value: serde_json::Value = super::decode(0, &document)?;
    LearningMetrics::from_json(value)
        .map(Some)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Replace the stored document (last writer wins)
pub fn save_metrics(conn: &Connection, metrics: &LearningMetrics) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO metrics (user_id, document, updated_at) VALUES (?1, ?2, ?3)
    ON CONFLICT(user_id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at
    "#,
        params![
            metrics.user_id,
            encode(metrics)?,
            super::timestamp(metrics.last_updated)
        ],
    )?;
    Ok(())
}

/// Load a learner's metrics, creating and storing a fresh document on first use
pub fn load_or_create_metrics(
    conn: &Connection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<LearningMetrics> {
    if let Some(metrics) = load_metrics(conn, user_id)? {
        return Ok(metrics);
    }

    tracing::info!("Creating learning metrics for user {}", user_id);
    let metrics = LearningMetrics::new(user_id, now);
    save_metrics(conn, &metrics)?;
    Ok(metrics)
}
