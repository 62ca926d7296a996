//! Turning model output into typed data.
//!
//! Completions are asked for JSON but routinely come back wrapped in markdown
//! fences, surrounded by prose or slightly malformed. Everything that reads a
//! completion goes through [`parse_lenient`] or [`format_response`].

pub mod answer;
pub mod classify;
pub mod repair;
pub mod response;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use answer::{compare_answers, AnswerMatch};
pub use repair::repair_json;
pub use response::{format_response, ExamQuestion, Step, StructuredResponse, FALLBACK_TITLE};

#[derive(Debug, Error)]
pub enum NormalizeError {
  #[error("no JSON found in model output")]
  NoJson,
  #[error("model output is not valid JSON: {0}")]
  Invalid(#[from] serde_json::Error),
}

/// Locate the JSON payload inside a completion.
///
/// A ```json fence wins, then any fence whose body looks like JSON, then the
/// span from the first `{`/`[` to the last matching closer.
pub fn extract_json(text: &str) -> Option<&str> {
  if let Some(start) = text.find("```json") {
    let body = &text[start + 7..];
    if let Some(end) = body.find("```") {
      return Some(body[..end].trim());
    }
  }

  if let Some(start) = text.find("```") {
    let body = &text[start + 3..];
    if let Some(end) = body.find("```") {
      let candidate = body[..end].trim();
      if candidate.starts_with(['{', '[']) {
        return Some(candidate);
      }
    }
  }

  let start = text.find(['{', '['])?;
  let close = if text[start..].starts_with('{') { '}' } else { ']' };
  let end = text.rfind(close)?;
  (end > start).then(|| &text[start..=end])
}

/// Extract, parse, and on failure repair and parse again
pub fn parse_lenient<T: DeserializeOwned>(text: &str) -> Result<T, NormalizeError> {
  let candidate = extract_json(text).ok_or(NormalizeError::NoJson)?;

  match serde_json::from_str(candidate) {
    Ok(value) => Ok(value),
    Err(e) => {
      tracing::debug!("Raw JSON parse failed ({}), attempting repair", e);
      let repaired = repair_json(candidate);
      Ok(serde_json::from_str(&repaired)?)
    }
  }
}
