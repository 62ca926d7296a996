//! Generated courses

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::{decode, encode};
use crate::domain::{ChapterContent, Course, CourseError};

#[derive(Debug, Error)]
pub enum CourseStoreError {
    #[error("course not found")]
    NotFound,
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

pub fn save_course(conn: &Connection, course: &Course) -> rusqlite::Result<()> {
    conn.execute(
        r#"
    INSERT INTO courses (course_id, created_by, status, document, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(course_id) DO UPDATE SET
      status = excluded.status, document = excluded.document, updated_at = excluded.updated_at
    "#,
        params![
            course.course_id,
            course.created_by,
            course.status.as_str(),
            encode(course)?,
            super::timestamp(Utc::now())
        ],
    )?;
    Ok(())
}

pub fn get_course(conn: &Connection, course_id: &str) -> rusqlite::Result<Option<Course>> {
    let document: Option<String> = conn
        .query_row(
            "SELECT document FROM courses WHERE course_id = ?1",
            params![course_id],
            |row| row.get(0),
        )
        .optional()?;

    document.map(|d| decode(0, &d)).transpose()
}

/// Load, modify and store a course
fn update_course<F>(conn: &Connection, course_id: &str, change: F) -> Result<Course, CourseStoreError>
where
    F: FnOnce(&mut Course) -> Result<(), CourseError>,
{
    let mut course = get_course(conn, course_id)?.ok_or(CourseStoreError::NotFound)?;
    change(&mut course)?;
    save_course(conn, &course)?;
    Ok(course)
}

/// Backfill one chapter. The course is marked completed once every chapter
/// in its layout has content.
pub fn save_chapter_content(
    conn: &Connection,
    course_id: &str,
    content: ChapterContent,
) -> Result<Course, CourseStoreError> {
    let index = content.index;
    let course = update_course(conn, course_id, |course| course.set_chapter_content(content))?;
    tracing::debug!(
        "Stored chapter {} of course {} ({}/{} chapters)",
        index,
        course_id,
        course.chapters.len(),
        course.chapter_count()
    );
    Ok(course)
}

pub fn rename_chapter(
    conn: &Connection,
    course_id: &str,
    index: usize,
    name: &str,
) -> Result<Course, CourseStoreError> {
    update_course(conn, course_id, |course| course.rename_chapter(index, name))
}
