pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod llm;
pub mod normalizer;
pub mod paths;
pub mod session;
pub mod srs;
pub mod state;

#[cfg(test)]
pub mod testing;

use axum::{
  routing::{get, patch, post},
  Router,
};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the JSON API router
pub fn app(state: AppState) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    // Learning metrics
    .route("/api/metrics", get(handlers::metrics::get_metrics))
    .route("/api/metrics/summary", get(handlers::metrics::get_summary))
    .route("/api/metrics/sessions", post(handlers::metrics::start_session))
    .route("/api/metrics/sessions/end", post(handlers::metrics::end_session))
    .route("/api/metrics/answers", post(handlers::metrics::record_answer))
    .route("/api/metrics/feedback", post(handlers::metrics::record_feedback))
    // Flashcard review
    .route(
      "/api/flashcards/sessions",
      get(handlers::flashcards::list_sessions).post(handlers::flashcards::create_session),
    )
    .route("/api/flashcards/sessions/{id}", get(handlers::flashcards::get_session))
    .route("/api/flashcards/sessions/{id}/current", post(handlers::flashcards::mark_current))
    .route("/api/flashcards/sessions/{id}/navigate", post(handlers::flashcards::navigate))
    .route(
      "/api/flashcards/sessions/{id}/cards/{card_id}",
      post(handlers::flashcards::mark_card),
    )
    // Progress
    .route("/api/progress", get(handlers::progress::get_progress))
    .route("/api/progress/quizzes", post(handlers::progress::record_quiz))
    // Assistant and notes
    .route("/api/assistant/messages", post(handlers::assistant::post_message))
    .route("/api/notes/improve", post(handlers::notes::improve_note))
    .route("/api/notes/flashcards", post(handlers::notes::generate_flashcards))
    // Courses
    .route("/api/courses", post(handlers::courses::create_course))
    .route("/api/courses/{id}", get(handlers::courses::get_course))
    .route("/api/courses/{id}/content", post(handlers::courses::generate_content))
    .route(
      "/api/courses/{id}/chapters/{index}",
      patch(handlers::courses::rename_chapter),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
