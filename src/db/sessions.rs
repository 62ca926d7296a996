//! Flashcard review sessions, one document per session

use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{decode, encode};
use crate::srs::ReviewSession;

pub fn save_session(conn: &Connection, session: &ReviewSession) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO flashcard_sessions (user_id, session_id, document, updated_at) VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(user_id, session_id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at
    "#,
        params![
            session.user_id,
            session.id,
            encode(session)?,
            super::timestamp(session.last_updated)
        ],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, user_id: &str, session_id: &str) -> Result<Option<ReviewSession>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM flashcard_sessions WHERE user_id = ?1 AND session_id = ?2",
            params![user_id, session_id],
            |row| row.get(0),
        )
        .optional()?;

    document.map(|d| decode(0, &d)).transpose()
}

/// A learner's sessions, most recently updated first
pub fn list_sessions(conn: &Connection, user_id: &str) -> Result<Vec<ReviewSession>> {
    let mut stmt = conn.prepare(
        "SELECT document FROM flashcard_sessions WHERE user_id = ?1 ORDER BY updated_at DESC, session_id DESC",
    )?;
    let documents = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

    documents.map(|d| decode(0, &d?)).collect()
}
