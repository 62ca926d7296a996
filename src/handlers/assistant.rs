//! Course assistant chat.
//!
//! A reply that carries an exam question leaves the question pending for the
//! learner; their next message is graded against it instead of being sent to
//! the assistant, and the verdict is recorded into their metrics.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::metrics::update_metrics;
use super::{ApiError, ApiResult};
use crate::db::{self, try_lock, LogOnError};
use crate::domain::{AnswerRecord, ProgressSummary};
use crate::llm::tutor::{self, Evaluation};
use crate::normalizer::classify::{classify_difficulty, explanation_length, learning_style};
use crate::normalizer::{ExamQuestion, StructuredResponse};
use crate::state::{AppState, UserContext};

/// Error type recorded for wrong exam answers
const EXAM_ERROR: &str = "exam_answer";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
  pub message: String,
  #[serde(default)]
  pub course_id: Option<String>,
  /// Display name used to address the learner
  #[serde(default)]
  pub user_name: Option<String>,
  /// Seconds the learner took to answer a pending question
  #[serde(default)]
  pub response_time: Option<f64>,
  /// Self-reported confidence, 1-5
  #[serde(default)]
  pub confidence: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AssistantReply {
  #[serde(rename_all = "camelCase")]
  Response {
    response: StructuredResponse,
    /// The learner's next message will be graded
    awaiting_answer: bool,
  },
  #[serde(rename_all = "camelCase")]
  Evaluation {
    question: String,
    evaluation: Evaluation,
    summary: ProgressSummary,
  },
}

/// POST /api/assistant/messages
pub async fn post_message(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<MessageRequest>,
) -> ApiResult<Json<AssistantReply>> {
  let message = request.message.trim();
  if message.is_empty() {
    return Err(ApiError::BadRequest("Message cannot be empty".to_string()));
  }

  match state.chat_sessions.take_pending_exam(&user.user_id, Utc::now()) {
    Some(exam) => answer_exam(&state, &user, &request, exam, message).await,
    None => ask_assistant(&state, &user, &request, message).await,
  }
}

async fn answer_exam(
  state: &AppState,
  user: &UserContext,
  request: &MessageRequest,
  exam: ExamQuestion,
  answer: &str,
) -> ApiResult<Json<AssistantReply>> {
  let evaluation =
    tutor::evaluate_answer(state.llm.as_ref(), &exam, answer, request.user_name.as_deref()).await;

  let record = AnswerRecord {
    is_correct: evaluation.is_correct,
    topic: exam.topic.clone(),
    difficulty: exam.difficulty.as_deref().and_then(classify_difficulty),
    response_time: request.response_time.unwrap_or(0.0),
    confidence: request.confidence,
  };
  let updated = update_metrics(state, &user.user_id, |metrics, now| {
    metrics.record_answer(&record, now);
    if !record.is_correct {
      metrics.record_error(EXAM_ERROR, now);
    }
  });
  let metrics = match updated {
    Ok(metrics) => metrics,
    Err(e) => {
      // Unrecorded answers leave the question open for another try
      state.chat_sessions.set_pending_exam(&user.user_id, exam, Utc::now());
      return Err(e);
    }
  };

  tracing::info!(
    "Graded answer from {} on '{}': {} ({:.0}%)",
    user.user_id,
    exam.topic,
    if evaluation.is_correct { "correct" } else { "incorrect" },
    evaluation.accuracy
  );

  Ok(Json(AssistantReply::Evaluation {
    question: exam.question,
    evaluation,
    summary: metrics.progress_summary(),
  }))
}

async fn ask_assistant(
  state: &AppState,
  user: &UserContext,
  request: &MessageRequest,
  question: &str,
) -> ApiResult<Json<AssistantReply>> {
  // Lock is released before the completion is awaited
  let (course, metrics) = {
    let conn = try_lock(&state.db)?;
    let course = match request.course_id.as_deref() {
      Some(id) => Some(db::get_course(&conn, id)?.ok_or(ApiError::NotFound("Course"))?),
      None => None,
    };
    let metrics = db::load_metrics(&conn, &user.user_id).log_warn("Failed to load metrics").flatten();
    (course, metrics)
  };

  let mut response = tutor::generate_course_response(
    state.llm.as_ref(),
    question,
    course.as_ref(),
    metrics.as_ref(),
    request.user_name.as_deref(),
  )
  .await?;

  let style = learning_style(&response);
  let length = explanation_length(&response.explanation);
  update_metrics(state, &user.user_id, |metrics, now| {
    metrics.record_learning_style(style, now);
    metrics.record_explanation_length(length, now);
  })?;

  let mut awaiting_answer = false;
  if response.is_exam_request() {
    if let Some(exam) = response.exam.as_mut() {
      state
        .chat_sessions
        .set_pending_exam(&user.user_id, exam.clone(), Utc::now());
      // The learner must not see the expected answer
      exam.correct_answer.clear();
      awaiting_answer = true;
    }
  }

  Ok(Json(AssistantReply::Response {
    response,
    awaiting_answer,
  }))
}
