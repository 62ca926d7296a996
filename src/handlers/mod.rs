pub mod assistant;
pub mod courses;
pub mod flashcards;
pub mod metrics;
pub mod notes;
pub mod progress;

use axum::{
  extract::FromRequestParts,
  http::{request::Parts, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config;
use crate::db::{CourseStoreError, DbLockError};
use crate::llm::LlmError;
use crate::srs::SchedulerError;
use crate::state::{AppState, UserContext};

/// Error type shared by all JSON endpoints. Rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing {} header", config::USER_ID_HEADER)]
  Unauthorized,

  #[error("{0}")]
  BadRequest(String),

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("not allowed to modify this resource")]
  Forbidden,

  #[error(transparent)]
  Lock(#[from] DbLockError),

  #[error(transparent)]
  Db(#[from] rusqlite::Error),

  #[error(transparent)]
  Llm(#[from] LlmError),

  #[error(transparent)]
  Scheduler(#[from] SchedulerError),

  #[error(transparent)]
  CourseStore(#[from] CourseStoreError),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::Lock(_) | Self::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Llm(LlmError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Llm(_) => StatusCode::BAD_GATEWAY,
      Self::Scheduler(SchedulerError::CardNotFound(_)) => StatusCode::NOT_FOUND,
      Self::Scheduler(SchedulerError::EmptySession) => StatusCode::BAD_REQUEST,
      Self::Scheduler(SchedulerError::SessionFinished) => StatusCode::CONFLICT,
      Self::Scheduler(SchedulerError::IntervalOutOfRange(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Scheduler(SchedulerError::Fsrs(_)) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::CourseStore(CourseStoreError::NotFound) => StatusCode::NOT_FOUND,
      Self::CourseStore(CourseStoreError::Course(_)) => StatusCode::BAD_REQUEST,
      Self::CourseStore(CourseStoreError::Sql(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
      tracing::error!("Request failed: {}", self);
      match self {
        Self::Scheduler(_) => "Scheduling error".to_string(),
        _ => "Database error".to_string(),
      }
    } else {
      if status.is_server_error() {
        tracing::warn!("Upstream failure: {}", self);
      }
      self.to_string()
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Identity comes from the `X-User-Id` header set by the identity provider
/// in front of this service.
impl FromRequestParts<AppState> for UserContext {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
    let user_id = parts
      .headers
      .get(config::USER_ID_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .ok_or(ApiError::Unauthorized)?;

    Ok(UserContext {
      user_id: user_id.to_string(),
    })
  }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
  Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_statuses() {
    assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::Llm(LlmError::NotConfigured).status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ApiError::Llm(LlmError::EmptyResponse).status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
      ApiError::Scheduler(SchedulerError::CardNotFound("c1".into())).status(),
      StatusCode::NOT_FOUND
    );
    assert_eq!(ApiError::CourseStore(CourseStoreError::NotFound).status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn test_scheduler_statuses() {
    assert_eq!(ApiError::Scheduler(SchedulerError::SessionFinished).status(), StatusCode::CONFLICT);
    assert_eq!(
      ApiError::Scheduler(SchedulerError::IntervalOutOfRange(9)).status(),
      StatusCode::UNPROCESSABLE_ENTITY
    );
  }

  #[tokio::test]
  async fn test_scheduler_failure_message() {
    let response = ApiError::Scheduler(SchedulerError::Fsrs("bad parameters".into())).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Scheduling error");
  }

  #[test]
  fn test_internal_errors_are_not_leaked() {
    let response = ApiError::Lock(DbLockError).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
