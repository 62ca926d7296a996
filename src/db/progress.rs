//! Finished review sessions and quiz results

use rusqlite::{params, Connection, Result};

use super::{decode, encode};
use crate::domain::{ProgressRecord, QuizResult};

pub fn insert_progress_record(conn: &Connection, user_id: &str, record: &ProgressRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO progress_records (user_id, session_id, document, recorded_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            user_id,
            record.session_id,
            encode(record)?,
            super::timestamp(record.recorded_at)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Progress records, newest first
pub fn get_progress_records(conn: &Connection, user_id: &str) -> Result<Vec<ProgressRecord>> {
    let mut stmt = conn.prepare(
        "SELECT document FROM progress_records WHERE user_id = ?1 ORDER BY recorded_at DESC, id DESC",
    )?;
    let documents = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

    documents.map(|d| decode(0, &d?)).collect()
}

pub fn insert_quiz_result(conn: &Connection, user_id: &str, result: &QuizResult) -> Result<i64> {
    conn.execute(
        "INSERT INTO quiz_history (user_id, document, taken_at) VALUES (?1, ?2, ?3)",
        params![user_id, encode(result)?, super::timestamp(result.timestamp)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Raw quiz history, newest first. Duplicates are kept; callers dedupe.
pub fn get_quiz_history(conn: &Connection, user_id: &str) -> Result<Vec<QuizResult>> {
    let mut stmt = conn.prepare(
        "SELECT document FROM quiz_history WHERE user_id = ?1 ORDER BY taken_at DESC, id DESC",
    )?;
    let documents = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

    documents.map(|d| decode(0, &d?)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::SessionSummary;
    use crate::testing::TestEnv;
    use chrono::{Duration, Utc};

    fn summary() -> SessionSummary {
        SessionSummary {
            time_spent: 120,
            average_time: 40,
            completion_rate: 66.7,
            mastered: 2,
            reviewing: 1,
            total: 3,
        }
    }

    #[test]
    fn test_progress_records_newest_first() {
        let env = TestEnv::new().unwrap();
        let now = Utc::now();
        for (i, offset) in [-120, 0, -60].into_iter().enumerate() {
            let record = ProgressRecord {
                session_id: format!("s{}", i),
                subjects: vec!["Rust".into()],
                summary: summary(),
                recorded_at: now + Duration::seconds(offset),
            };
            insert_progress_record(&env.conn, "u1", &record).unwrap();
        }

        let ids: Vec<String> = get_progress_records(&env.conn, "u1")
            .unwrap()
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        assert_eq!(ids, vec!["s1", "s2", "s0"]);
        assert!(get_progress_records(&env.conn, "u2").unwrap().is_empty());
    }

    #[test]
    fn test_quiz_history_keeps_duplicates() {
        let env = TestEnv::new().unwrap();
        let now = Utc::now();
        let quiz = QuizResult::new(now, 10, 8, Some("traits".into()));
        insert_quiz_result(&env.conn, "u1", &quiz).unwrap();
        insert_quiz_result(&env.conn, "u1", &quiz).unwrap();

        let history = get_quiz_history(&env.conn, "u1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].score, 80.0);
    }
}
