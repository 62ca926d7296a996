//! Course generation endpoints.

use axum::{
  extract::{Path, State},
  Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult};
use crate::db::{self, try_lock};
use crate::domain::course::generate_course_id;
use crate::domain::{Course, CourseInput};
use crate::llm::tutor;
use crate::state::{AppState, UserContext};

fn load_course(state: &AppState, course_id: &str) -> ApiResult<Course> {
  let conn = try_lock(&state.db)?;
  db::get_course(&conn, course_id)?.ok_or(ApiError::NotFound("Course"))
}

/// Load a course the caller is allowed to modify
fn load_owned_course(state: &AppState, user: &UserContext, course_id: &str) -> ApiResult<Course> {
  let course = load_course(state, course_id)?;
  if course.created_by != user.user_id {
    return Err(ApiError::Forbidden);
  }
  Ok(course)
}

/// POST /api/courses
pub async fn create_course(
  user: UserContext,
  State(state): State<AppState>,
  Json(input): Json<CourseInput>,
) -> ApiResult<Json<Course>> {
  input.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

  let layout = tutor::generate_course_layout(state.llm.as_ref(), &input).await?;
  if layout.chapters.is_empty() {
    return Err(ApiError::BadRequest("Generated layout has no chapters".to_string()));
  }

  let course = Course::new(generate_course_id(), user.user_id.clone(), &input, layout);
  {
    let conn = try_lock(&state.db)?;
    db::save_course(&conn, &course)?;
  }

  tracing::info!(
    "Created course {} '{}' for {} ({} chapters, {} min each)",
    course.course_id,
    course.layout.name,
    user.user_id,
    course.chapter_count(),
    course.minutes_per_chapter()
  );
  Ok(Json(course))
}

/// GET /api/courses/{id}
pub async fn get_course(
  _user: UserContext,
  State(state): State<AppState>,
  Path(course_id): Path<String>,
) -> ApiResult<Json<Course>> {
  Ok(Json(load_course(&state, &course_id)?))
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentRequest {
  /// Chapter indices to (re)generate; defaults to every chapter without content
  #[serde(default)]
  pub chapters: Option<Vec<usize>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
  pub course: Course,
  /// Chapters whose generation failed and can be retried
  pub failed_chapters: Vec<usize>,
}

/// POST /api/courses/{id}/content
pub async fn generate_content(
  user: UserContext,
  State(state): State<AppState>,
  Path(course_id): Path<String>,
  Json(request): Json<GenerateContentRequest>,
) -> ApiResult<Json<GenerateContentResponse>> {
  let mut course = load_owned_course(&state, &user, &course_id)?;

  let pending: Vec<usize> = match request.chapters {
    Some(indices) => {
      if let Some(bad) = indices.iter().find(|&&i| i >= course.chapter_count()) {
        return Err(ApiError::BadRequest(format!("Chapter {} does not exist", bad)));
      }
      indices
    }
    None => (0..course.chapter_count())
      .filter(|i| !course.chapters.iter().any(|c| c.index == *i))
      .collect(),
  };

  let mut failed_chapters = Vec::new();
  for index in pending {
    let outline = course.layout.chapters[index].clone();
    match tutor::generate_chapter_content(state.llm.as_ref(), &course.layout.name, index, &outline).await {
      Ok(content) => {
        let conn = try_lock(&state.db)?;
        course = db::save_chapter_content(&conn, &course_id, content)?;
      }
      Err(e) => {
        tracing::warn!("Chapter {} of course {} failed: {}", index, course_id, e);
        failed_chapters.push(index);
      }
    }
  }

  Ok(Json(GenerateContentResponse {
    course,
    failed_chapters,
  }))
}

#[derive(Debug, Deserialize)]
pub struct RenameChapterRequest {
  pub name: String,
}

/// PATCH /api/courses/{id}/chapters/{index}
pub async fn rename_chapter(
  user: UserContext,
  State(state): State<AppState>,
  Path((course_id, index)): Path<(String, usize)>,
  Json(request): Json<RenameChapterRequest>,
) -> ApiResult<Json<Course>> {
  load_owned_course(&state, &user, &course_id)?;
  let conn = try_lock(&state.db)?;
  Ok(Json(db::rename_chapter(&conn, &course_id, index, &request.name)?))
}
