//! Test utilities for database setup.
//!
//! Reuses the authoritative schema initialization so tests never carry
//! their own copy of the tables.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary database file with all migrations applied.
///
/// The directory is removed when the environment is dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    /// Connection with the full schema
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("course_tutor.db"))?;
        crate::db::schema::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp.path().join("course_tutor.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_has_schema() {
        let env = TestEnv::new().unwrap();
        assert!(env.db_path().exists());
        let count: i64 = env
            .conn
            .query_row("SELECT COUNT(*) FROM metrics", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
