use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::parse_lenient;

/// Title used when a completion could not be read as a structured answer
pub const FALLBACK_TITLE: &str = "Assistant Response";

/// Kind tag of a response that carries an exam question
pub const EXAM_REQUEST: &str = "exam_request";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
  #[serde(default, deserialize_with = "text")]
  pub title: String,
  #[serde(default, deserialize_with = "text")]
  pub description: String,
}

/// Steps arrive either as objects or as bare strings
#[derive(Deserialize)]
#[serde(untagged)]
enum StepRepr {
  Full(Step),
  Text(String),
}

impl From<StepRepr> for Step {
  fn from(repr: StepRepr) -> Self {
    match repr {
      StepRepr::Full(step) => step,
      StepRepr::Text(description) => Step {
        title: String::new(),
        description,
      },
    }
  }
}

/// Question the assistant asked; the learner's next message answers it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
  #[serde(deserialize_with = "text")]
  pub question: String,
  #[serde(alias = "correct_answer", alias = "answer", deserialize_with = "text")]
  pub correct_answer: String,
  #[serde(default, deserialize_with = "text")]
  pub topic: String,
  #[serde(default)]
  pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub title: String,
  #[serde(default, deserialize_with = "text")]
  pub explanation: String,
  #[serde(default, deserialize_with = "steps")]
  pub steps: Vec<Step>,
  #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
  pub example: Option<String>,
  #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
  pub info: Option<String>,
  #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
  pub warning: Option<String>,
  #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(default, deserialize_with = "optional_text", skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exam: Option<ExamQuestion>,
}

impl StructuredResponse {
  pub fn fallback(text: &str) -> Self {
    Self {
      title: FALLBACK_TITLE.to_string(),
      explanation: text.to_string(),
      ..Self::default()
    }
  }

  pub fn is_exam_request(&self) -> bool {
    self.kind.as_deref() == Some(EXAM_REQUEST) && self.exam.is_some()
  }
}

/// Coerce a completion into a structured response.
///
/// Parsing is only attempted when the text mentions a `title` or
/// `explanation` key; anything else becomes a plain explanation.
pub fn format_response(text: &str) -> StructuredResponse {
  if mentions_key(text, "title") || mentions_key(text, "explanation") {
    match parse_lenient::<StructuredResponse>(text) {
      Ok(response) if !response.title.is_empty() || !response.explanation.is_empty() => {
        return response;
      }
      Ok(_) => tracing::debug!("Structured response had neither title nor explanation"),
      Err(e) => tracing::warn!("Falling back to plain assistant response: {}", e),
    }
  }
  StructuredResponse::fallback(text)
}

/// `"key"` followed by optional whitespace and a colon
fn mentions_key(text: &str, key: &str) -> bool {
  let needle = format!("\"{}\"", key);
  text.match_indices(&needle).any(|(pos, _)| {
    text[pos + needle.len()..].trim_start().starts_with(':')
  })
}

/// Render any JSON value as text; models sometimes send numbers or objects
/// where prose was asked for.
fn value_to_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s),
    Value::Array(items) => Some(
      items
        .into_iter()
        .filter_map(value_to_text)
        .collect::<Vec<_>>()
        .join("\n"),
    ),
    other => Some(other.to_string()),
  }
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  Ok(value_to_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  Ok(value_to_text(Value::deserialize(deserializer)?).filter(|s| !s.trim().is_empty()))
}

fn steps<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Step>, D::Error> {
  let raw: Option<Vec<StepRepr>> = Option::deserialize(deserializer)?;
  Ok(raw.unwrap_or_default().into_iter().map(Step::from).collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_plain_text_falls_back() {
    let r = format_response("Ownership means every value has a single owner.");
    assert_eq!(r.title, FALLBACK_TITLE);
    assert_eq!(r.explanation, "Ownership means every value has a single owner.");
    assert!(r.steps.is_empty());
    assert!(r.kind.is_none());
  }

  #[test]
  fn test_structured_json() {
    let text = r#"```json
{
  "title": "Borrowing",
  "explanation": "References let you use a value without owning it.",
  "steps": [{"title": "Step 1", "description": "Take a reference"}],
  "code": "let r = &x;",
  "language": "rust"
}
```"#;
    let r = format_response(text);
    assert_eq!(r.title, "Borrowing");
    assert_eq!(r.steps.len(), 1);
    assert_eq!(r.steps[0].description, "Take a reference");
    assert_eq!(r.code.as_deref(), Some("let r = &x;"));
    assert_eq!(r.language.as_deref(), Some("rust"));
    assert!(r.example.is_none());
  }

  #[test]
  fn test_malformed_json_is_repaired() {
    let text = "{\"title\": \"Loops\" \"explanation\": \"Use for\nover iterators\", \"steps\": [\"first\", \"second\",],}";
    let r = format_response(text);
    assert_eq!(r.title, "Loops");
    assert_eq!(r.explanation, "Use for\nover iterators");
    assert_eq!(r.steps.len(), 2);
    assert_eq!(r.steps[1].description, "second");
    assert!(r.steps[1].title.is_empty());
  }

  #[test]
  fn test_unrepairable_json_falls_back_to_raw_text() {
    let text = "{\"title\": \"Broken\", \"explanation\": }";
    let r = format_response(text);
    assert_eq!(r.title, FALLBACK_TITLE);
    assert_eq!(r.explanation, text);
  }

  #[test]
  fn test_key_must_be_followed_by_colon() {
    let text = "The word \"title\" is a JSON key: {\"x\": 1}";
    let r = format_response(text);
    assert_eq!(r.title, FALLBACK_TITLE);
    assert!(mentions_key("{\"title\" : \"a\"}", "title"));
  }

  #[test]
  fn test_exam_request() {
    let text = r#"{
      "type": "exam_request",
      "title": "Quick check",
      "explanation": "Answer this:",
      "exam": {"question": "What does &mut mean?", "correctAnswer": "a mutable reference", "topic": "borrowing"}
    }"#;
    let r = format_response(text);
    assert!(r.is_exam_request());
    let exam = r.exam.unwrap();
    assert_eq!(exam.correct_answer, "a mutable reference");
    assert_eq!(exam.topic, "borrowing");
  }

  #[test]
  fn test_non_string_fields_are_rendered() {
    let text = r#"{"title": "Numbers", "explanation": ["a", "b"], "example": 42, "info": null, "warning": ""}"#;
    let r = format_response(text);
    assert_eq!(r.explanation, "a\nb");
    assert_eq!(r.example.as_deref(), Some("42"));
    assert!(r.info.is_none());
    assert!(r.warning.is_none());
  }

  #[test]
  fn test_serialized_shape() {
    let r = StructuredResponse::fallback("hi");
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["title"], FALLBACK_TITLE);
    assert_eq!(json["steps"], serde_json::json!([]));
    assert!(json.get("type").is_none());
    assert!(json.get("code").is_none());
  }
}
