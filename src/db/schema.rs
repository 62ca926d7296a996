use rusqlite::{Connection, Result};

/// Every table holds a JSON document plus the columns it is looked up by.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS metrics (
      user_id TEXT PRIMARY KEY,
      document TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS flashcard_sessions (
      user_id TEXT NOT NULL,
      session_id TEXT NOT NULL,
      document TEXT NOT NULL,
      updated_at TEXT NOT NULL,
      PRIMARY KEY (user_id, session_id)
    );

    CREATE TABLE IF NOT EXISTS progress_records (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id TEXT NOT NULL,
      session_id TEXT NOT NULL,
      document TEXT NOT NULL,
      recorded_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS quiz_history (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      user_id TEXT NOT NULL,
      document TEXT NOT NULL,
      taken_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS courses (
      course_id TEXT PRIMARY KEY,
      created_by TEXT NOT NULL,
      status TEXT NOT NULL DEFAULT 'DRAFT',
      document TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_progress_records_user ON progress_records(user_id, recorded_at);
    CREATE INDEX IF NOT EXISTS idx_quiz_history_user ON quiz_history(user_id, taken_at);
    CREATE INDEX IF NOT EXISTS idx_courses_created_by ON courses(created_by);
    "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('metrics', 'flashcard_sessions', 'progress_records', 'quiz_history', 'courses')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }
}
