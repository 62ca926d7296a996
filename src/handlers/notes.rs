use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult};
use crate::db::{self, try_lock, LogOnError};
use crate::domain::Flashcard;
use crate::llm::tutor::{self, NoteSource};
use crate::state::{AppState, UserContext};

#[derive(Debug, Deserialize)]
pub struct ImproveNoteRequest {
  pub content: String,
  #[serde(default)]
  pub subject: String,
}

#[derive(Debug, Serialize)]
pub struct ImproveNoteResponse {
  pub improved: String,
}

/// POST /api/notes/improve
pub async fn improve_note(
  _user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<ImproveNoteRequest>,
) -> ApiResult<Json<ImproveNoteResponse>> {
  if request.content.trim().is_empty() {
    return Err(ApiError::BadRequest("Note content cannot be empty".to_string()));
  }
  let improved = tutor::improve_note(state.llm.as_ref(), &request.content, &request.subject).await?;
  Ok(Json(ImproveNoteResponse { improved }))
}

#[derive(Debug, Deserialize)]
pub struct GenerateFlashcardsRequest {
  pub notes: Vec<NoteSource>,
  /// Topics cards are attributed to; defaults to the topics the learner
  /// already has metrics for
  #[serde(default)]
  pub topics: Option<Vec<String>>,
}

/// POST /api/notes/flashcards
pub async fn generate_flashcards(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<GenerateFlashcardsRequest>,
) -> ApiResult<Json<Vec<Flashcard>>> {
  let notes: Vec<&NoteSource> = request.notes.iter().filter(|n| !n.content.trim().is_empty()).collect();
  if notes.is_empty() {
    return Err(ApiError::BadRequest("Select at least one note with content".to_string()));
  }

  let topics = match request.topics {
    Some(topics) => topics,
    None => {
      let conn = try_lock(&state.db)?;
      db::load_metrics(&conn, &user.user_id)
        .log_warn("Failed to load metrics")
        .flatten()
        .map(|m| {
          m.mastered_topics()
            .iter()
            .chain(m.improvement_areas())
            .cloned()
            .collect()
        })
        .unwrap_or_default()
    }
  };

  let mut cards = Vec::new();
  let mut last_error = None;
  for note in notes {
    match tutor::generate_flashcards(state.llm.as_ref(), note, &topics).await {
      Ok(generated) => cards.extend(generated),
      Err(e) => {
        tracing::warn!("Flashcard generation failed for note {}: {}", note.id, e);
        last_error = Some(e);
      }
    }
  }

  match (cards.is_empty(), last_error) {
    (true, Some(e)) => Err(e.into()),
    _ => Ok(Json(cards)),
  }
}
