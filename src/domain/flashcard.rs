use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::review::Difficulty;
use crate::config;

/// Review status shown to the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
  #[default]
  New,
  Reviewing,
  Mastered,
}

fn default_ease_factor() -> f64 {
  2.5
}

/// A flashcard derived from a learner's note.
///
/// The SRS fields default so that documents written before scheduling was
/// tracked still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
  pub id: String,
  pub front: String,
  pub back: String,
  #[serde(default)]
  pub subject: Option<String>,
  #[serde(default)]
  pub note_id: Option<String>,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
  #[serde(default)]
  pub status: CardStatus,
  #[serde(default)]
  pub last_reviewed: Option<DateTime<Utc>>,
  #[serde(default)]
  pub review_count: u32,

  // SM-2
  #[serde(default = "default_ease_factor")]
  pub ease_factor: f64,
  #[serde(default)]
  pub interval_days: i64,
  #[serde(default)]
  pub repetitions: i64,
  #[serde(default)]
  pub next_review: Option<DateTime<Utc>>,

  // Learning steps: 0-3=learning, 4+=graduated to FSRS
  #[serde(default)]
  pub learning_step: i64,
  #[serde(default)]
  pub fsrs_stability: Option<f64>,
  #[serde(default)]
  pub fsrs_difficulty: Option<f64>,
}

impl Flashcard {
  pub fn new(id: String, front: String, back: String) -> Self {
    Self {
      id,
      front,
      back,
      subject: None,
      note_id: None,
      topic: None,
      difficulty: None,
      status: CardStatus::New,
      last_reviewed: None,
      review_count: 0,
      ease_factor: default_ease_factor(),
      interval_days: 0,
      repetitions: 0,
      next_review: None,
      learning_step: 0,
      fsrs_stability: None,
      fsrs_difficulty: None,
    }
  }

  /// Bring client-supplied scheduling fields back into the ranges the
  /// schedulers work with. Broken FSRS memory is dropped and reseeded on the
  /// next graduation.
  pub fn clamp_schedule(&mut self) {
    self.learning_step = self.learning_step.clamp(0, config::GRADUATING_STEP);
    self.interval_days = self.interval_days.clamp(0, config::MAX_INTERVAL_DAYS);
    self.repetitions = self.repetitions.max(0);
    self.ease_factor = if self.ease_factor.is_finite() {
      self.ease_factor.max(config::MIN_EASE_FACTOR)
    } else {
      default_ease_factor()
    };

    let memory_ok = matches!(
      (self.fsrs_stability, self.fsrs_difficulty),
      (Some(s), Some(d)) if s.is_finite() && s > 0.0 && d.is_finite()
    );
    if !memory_ok {
      self.fsrs_stability = None;
      self.fsrs_difficulty = None;
    }
  }

  /// New cards and cards past their review time are due
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    match self.next_review {
      None => true,
      Some(next) => next <= now,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_flashcard_new_defaults() {
    let card = Flashcard::new("c1".into(), "Q".into(), "A".into());
    assert_eq!(card.status, CardStatus::New);
    assert_eq!(card.review_count, 0);
    assert!(card.last_reviewed.is_none());
    assert!(card.next_review.is_none());
    assert!((card.ease_factor - 2.5).abs() < f64::EPSILON);
    assert_eq!(card.learning_step, 0);
  }

  #[test]
  fn test_legacy_document_loads() {
    // Shape written by the review UI before scheduling fields existed
    let json = r#"{
      "id": "n1-0",
      "front": "What is ownership?",
      "back": "A set of rules governing memory",
      "status": "reviewing",
      "lastReviewed": "2024-05-01T10:00:00Z",
      "reviewCount": 3
    }"#;
    let card: Flashcard = serde_json::from_str(json).unwrap();
    assert_eq!(card.status, CardStatus::Reviewing);
    assert_eq!(card.review_count, 3);
    assert!((card.ease_factor - 2.5).abs() < f64::EPSILON);
    assert!(card.difficulty.is_none());
  }

  #[test]
  fn test_is_due() {
    let now = Utc::now();
    let mut card = Flashcard::new("c1".into(), "Q".into(), "A".into());
    assert!(card.is_due(now));

    card.next_review = Some(now + Duration::hours(1));
    assert!(!card.is_due(now));

    card.next_review = Some(now - Duration::minutes(1));
    assert!(card.is_due(now));
  }

  #[test]
  fn test_clamp_schedule() {
    let mut card = Flashcard::new("c1".into(), "Q".into(), "A".into());
    card.learning_step = -2;
    card.interval_days = i64::MAX;
    card.repetitions = -7;
    card.ease_factor = f64::NAN;
    card.fsrs_stability = Some(f64::INFINITY);
    card.fsrs_difficulty = Some(5.0);

    card.clamp_schedule();
    assert_eq!(card.learning_step, 0);
    assert_eq!(card.interval_days, config::MAX_INTERVAL_DAYS);
    assert_eq!(card.repetitions, 0);
    assert!((card.ease_factor - 2.5).abs() < f64::EPSILON);
    assert_eq!(card.fsrs_stability, None);
    assert_eq!(card.fsrs_difficulty, None);

    card.learning_step = 40;
    card.ease_factor = 0.2;
    card.clamp_schedule();
    assert_eq!(card.learning_step, config::GRADUATING_STEP);
    assert!((card.ease_factor - config::MIN_EASE_FACTOR).abs() < f64::EPSILON);
  }
}
