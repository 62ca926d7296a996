//! Flashcard review session endpoints.

use axum::{
  extract::{Path, State},
  Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult};
use crate::db::{self, try_lock, LogOnError};
use crate::domain::{CardStatus, Flashcard, ProgressRecord, ReviewRating};
use crate::srs::{self, MarkOutcome, ReviewSession, SchedulerError};
use crate::state::{AppState, UserContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
  #[serde(default)]
  pub subjects: Vec<String>,
  pub flashcards: Vec<Flashcard>,
  /// Keep only new cards and cards past their review time
  #[serde(default)]
  pub due_only: bool,
}

/// POST /api/flashcards/sessions
pub async fn create_session(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<CreateSessionRequest>,
) -> ApiResult<Json<ReviewSession>> {
  let now = Utc::now();
  let mut cards: Vec<Flashcard> = if request.due_only {
    srs::due_cards(&request.flashcards, now).into_iter().cloned().collect()
  } else {
    request.flashcards
  };
  cards.iter_mut().for_each(Flashcard::clamp_schedule);

  if cards.is_empty() {
    return Err(ApiError::BadRequest("No flashcards to review".to_string()));
  }

  let session = ReviewSession::new(&user.user_id, request.subjects, cards, now);
  let conn = try_lock(&state.db)?;
  db::save_session(&conn, &session)?;

  tracing::info!(
    "Created review session {} for {} with {} cards",
    session.id,
    user.user_id,
    session.flashcards.len()
  );
  Ok(Json(session))
}

/// GET /api/flashcards/sessions
pub async fn list_sessions(user: UserContext, State(state): State<AppState>) -> ApiResult<Json<Vec<ReviewSession>>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::list_sessions(&conn, &user.user_id)?))
}

/// GET /api/flashcards/sessions/{id}
pub async fn get_session(
  user: UserContext,
  State(state): State<AppState>,
  Path(session_id): Path<String>,
) -> ApiResult<Json<ReviewSession>> {
  let conn = try_lock(&state.db)?;
  let session = db::get_session(&conn, &user.user_id, &session_id)?.ok_or(ApiError::NotFound("Session"))?;
  Ok(Json(session))
}

/// Either an explicit rating or the two-button status
#[derive(Debug, Deserialize)]
pub struct MarkRequest {
  #[serde(default)]
  pub rating: Option<ReviewRating>,
  #[serde(default)]
  pub status: Option<CardStatus>,
}

impl MarkRequest {
  fn rating(&self) -> ApiResult<ReviewRating> {
    self
      .rating
      .or_else(|| self.status.and_then(ReviewRating::from_status))
      .ok_or_else(|| ApiError::BadRequest("A rating or a reviewed status is required".to_string()))
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkResponse {
  #[serde(flatten)]
  pub outcome: MarkOutcome,
  pub card: Flashcard,
}

/// Mark a card, store the session and, when it just finished, its progress record
fn mark(
  state: &AppState,
  user_id: &str,
  session_id: &str,
  card_id: Option<&str>,
  rating: ReviewRating,
) -> ApiResult<MarkResponse> {
  let now = Utc::now();
  let conn = try_lock(&state.db)?;
  let mut session = db::get_session(&conn, user_id, session_id)?.ok_or(ApiError::NotFound("Session"))?;

  let card_id = match card_id {
    Some(card_id) => card_id.to_string(),
    None => session
      .current()
      .map(|c| c.id.clone())
      .ok_or(SchedulerError::EmptySession)?,
  };
  let outcome = session.mark_card(&card_id, rating, now, &state.srs)?;
  let card = session
    .flashcards
    .iter()
    .find(|c| c.id == card_id)
    .cloned()
    .ok_or(ApiError::NotFound("Card"))?;

  db::save_session(&conn, &session)?;

  if let Some(summary) = &outcome.summary {
    let record = ProgressRecord {
      session_id: session.id.clone(),
      subjects: session.subjects.clone(),
      summary: summary.clone(),
      recorded_at: now,
    };
    db::insert_progress_record(&conn, user_id, &record).log_warn("Failed to store progress record");
    tracing::info!(
      "Session {} finished: {}/{} mastered",
      session.id,
      summary.mastered,
      summary.total
    );
  }

  Ok(MarkResponse { outcome, card })
}

/// POST /api/flashcards/sessions/{id}/cards/{card_id}
pub async fn mark_card(
  user: UserContext,
  State(state): State<AppState>,
  Path((session_id, card_id)): Path<(String, String)>,
  Json(request): Json<MarkRequest>,
) -> ApiResult<Json<MarkResponse>> {
  let rating = request.rating()?;
  Ok(Json(mark(&state, &user.user_id, &session_id, Some(&card_id), rating)?))
}

/// POST /api/flashcards/sessions/{id}/current
pub async fn mark_current(
  user: UserContext,
  State(state): State<AppState>,
  Path(session_id): Path<String>,
  Json(request): Json<MarkRequest>,
) -> ApiResult<Json<MarkResponse>> {
  let rating = request.rating()?;
  Ok(Json(mark(&state, &user.user_id, &session_id, None, rating)?))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Next,
  Previous,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
  pub direction: Direction,
}

/// POST /api/flashcards/sessions/{id}/navigate
pub async fn navigate(
  user: UserContext,
  State(state): State<AppState>,
  Path(session_id): Path<String>,
  Json(request): Json<NavigateRequest>,
) -> ApiResult<Json<ReviewSession>> {
  let conn = try_lock(&state.db)?;
  let mut session =
    db::get_session(&conn, &user.user_id, &session_id)?.ok_or(ApiError::NotFound("Session"))?;

  match request.direction {
    Direction::Next => session.next(),
    Direction::Previous => session.previous(),
  }
  session.last_updated = Utc::now();
  db::save_session(&conn, &session)?;
  Ok(Json(session))
}
