//! Learning metrics endpoints.
//!
//! Every write is a read-modify-write of the learner's whole document.

use axum::{extract::State, Json};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::db::{self, try_lock};
use crate::domain::{AnswerRecord, DeviceInfo, LearningMetrics, ProgressSummary};
use crate::state::{AppState, UserContext};

/// Load the learner's metrics, apply `change` and store the result
pub(crate) fn update_metrics<F>(state: &AppState, user_id: &str, change: F) -> ApiResult<LearningMetrics>
where
  F: FnOnce(&mut LearningMetrics, DateTime<Utc>),
{
  let conn = try_lock(&state.db)?;
  let now = Utc::now();
  let mut metrics = db::load_or_create_metrics(&conn, user_id, now)?;
  change(&mut metrics, now);
  db::save_metrics(&conn, &metrics)?;
  Ok(metrics)
}

/// GET /api/metrics
pub async fn get_metrics(user: UserContext, State(state): State<AppState>) -> ApiResult<Json<LearningMetrics>> {
  let conn = try_lock(&state.db)?;
  let metrics = db::load_or_create_metrics(&conn, &user.user_id, Utc::now())?;
  Ok(Json(metrics))
}

/// GET /api/metrics/summary
pub async fn get_summary(user: UserContext, State(state): State<AppState>) -> ApiResult<Json<ProgressSummary>> {
  let conn = try_lock(&state.db)?;
  let metrics = db::load_or_create_metrics(&conn, &user.user_id, Utc::now())?;
  Ok(Json(metrics.progress_summary()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
  #[serde(default)]
  pub device: Option<String>,
  #[serde(default)]
  pub browser: Option<String>,
  /// Learner's offset from UTC, e.g. -300 for UTC-5
  #[serde(default)]
  pub utc_offset_minutes: i32,
}

/// POST /api/metrics/sessions
pub async fn start_session(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<StartSessionRequest>,
) -> ApiResult<Json<ProgressSummary>> {
  let offset = FixedOffset::east_opt(request.utc_offset_minutes.saturating_mul(60))
    .ok_or_else(|| ApiError::BadRequest("utcOffsetMinutes out of range".to_string()))?;
  let device = (request.device.is_some() || request.browser.is_some()).then(|| DeviceInfo {
    device: request.device,
    browser: request.browser,
  });

  let metrics = update_metrics(&state, &user.user_id, |metrics, now| {
    metrics.start_session(device.as_ref(), now.with_timezone(&offset));
  })?;
  tracing::debug!("Session started for {} ({} total)", user.user_id, metrics.usage.total_sessions);
  Ok(Json(metrics.progress_summary()))
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
  pub minutes: f64,
}

/// POST /api/metrics/sessions/end
pub async fn end_session(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<EndSessionRequest>,
) -> ApiResult<Json<ProgressSummary>> {
  let metrics = update_metrics(&state, &user.user_id, |metrics, now| {
    metrics.end_session(request.minutes, now);
  })?;
  Ok(Json(metrics.progress_summary()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAnswerRequest {
  #[serde(flatten)]
  pub answer: AnswerRecord,
  /// Kind of mistake, recorded for wrong answers
  #[serde(default)]
  pub error_type: Option<String>,
}

/// POST /api/metrics/answers
pub async fn record_answer(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<RecordAnswerRequest>,
) -> ApiResult<Json<ProgressSummary>> {
  let metrics = update_metrics(&state, &user.user_id, |metrics, now| {
    metrics.record_answer(&request.answer, now);
    if !request.answer.is_correct {
      if let Some(error_type) = request.error_type.as_deref().filter(|e| !e.trim().is_empty()) {
        metrics.record_error(error_type.trim(), now);
      }
    }
  })?;
  Ok(Json(metrics.progress_summary()))
}

/// Learner feedback and adaptation outcomes
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeedbackRequest {
  #[serde(rename_all = "camelCase")]
  Rating {
    topic: String,
    rating: u8,
    #[serde(default)]
    comment: Option<String>,
  },
  #[serde(rename_all = "camelCase")]
  Recommendation { successful: bool },
  #[serde(rename_all = "camelCase")]
  Improvement {
    topic: String,
    before_score: f64,
    after_score: f64,
  },
}

/// POST /api/metrics/feedback
pub async fn record_feedback(
  user: UserContext,
  State(state): State<AppState>,
  Json(request): Json<FeedbackRequest>,
) -> ApiResult<Json<LearningMetrics>> {
  let metrics = update_metrics(&state, &user.user_id, |metrics, now| match request {
    FeedbackRequest::Rating { topic, rating, comment } => metrics.record_rating(&topic, rating, comment, now),
    FeedbackRequest::Recommendation { successful } => metrics.record_recommendation(successful, now),
    FeedbackRequest::Improvement {
      topic,
      before_score,
      after_score,
    } => metrics.record_improvement(&topic, before_score, after_score, now),
  })?;
  Ok(Json(metrics))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_answer_request_flattens_record() {
    let request: RecordAnswerRequest = serde_json::from_str(
      r#"{"isCorrect": false, "topic": "traits", "responseTime": 3.5, "confidence": 2, "errorType": "syntax"}"#,
    )
    .unwrap();
    assert!(!request.answer.is_correct);
    assert_eq!(request.answer.topic, "traits");
    assert_eq!(request.answer.confidence, Some(2));
    assert_eq!(request.error_type.as_deref(), Some("syntax"));
  }

  #[test]
  fn test_feedback_kinds() {
    let rating: FeedbackRequest =
      serde_json::from_str(r#"{"kind": "rating", "topic": "traits", "rating": 4}"#).unwrap();
    assert!(matches!(rating, FeedbackRequest::Rating { rating: 4, .. }));

    let improvement: FeedbackRequest =
      serde_json::from_str(r#"{"kind": "improvement", "topic": "t", "beforeScore": 40, "afterScore": 70}"#)
        .unwrap();
    assert!(matches!(improvement, FeedbackRequest::Improvement { .. }));
  }
}
