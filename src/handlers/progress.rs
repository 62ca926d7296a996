use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult};
use crate::db::{self, try_lock};
use crate::domain::progress::{dedupe_quiz_history, quiz_stats};
use crate::domain::{ProgressRecord, QuizResult, QuizStats};
use crate::state::{AppState, UserContext};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
  pub records: Vec<ProgressRecord>,
  /// Newest first, near-duplicate submissions removed
  pub quiz_history: Vec<QuizResult>,
  pub quiz_stats: QuizStats,
}

/// GET /api/progress
pub async fn get_progress(user: UserContext, State(state): State<AppState>) -> ApiResult<Json<ProgressResponse>> {
  let conn = try_lock(&state.db)?;
  let records = db::get_progress_records(&conn, &user.user_id)?;
  let quiz_history = dedupe_quiz_history(db::get_quiz_history(&conn, &user.user_id)?);
  let quiz_stats = quiz_stats(&quiz_history);

  Ok(Json(ProgressResponse {
    records,
    quiz_history,
    quiz_stats,
  }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
  pub total_questions: u32,
  pub correct_answers: u32,
  #[serde(default)]
  pub topic: Option<String>,
  /// Client time the quiz finished; defaults to now
  #[serde(default)]
  pub timestamp: Option<DateTime<Utc>>,
}

/// POST /api/progress/quizzes
pub async fn record_quiz(
  user: UserContext,
  State(state): State<AppState>,
  Json(submission): Json<QuizSubmission>,
) -> ApiResult<Json<QuizResult>> {
  if submission.total_questions == 0 {
    return Err(ApiError::BadRequest("A quiz needs at least one question".to_string()));
  }

  let result = QuizResult::new(
    submission.timestamp.unwrap_or_else(Utc::now),
    submission.total_questions,
    submission.correct_answers,
    submission.topic.filter(|t| !t.trim().is_empty()),
  );

  let conn = try_lock(&state.db)?;
  db::insert_quiz_result(&conn, &user.user_id, &result)?;
  tracing::debug!("Recorded quiz for {}: {:.0}%", user.user_id, result.score);
  Ok(Json(result))
}
