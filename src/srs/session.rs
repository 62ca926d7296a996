//! Flashcard review sessions.
//!
//! A session is a snapshot of the cards a learner picked for one sitting,
//! persisted as a whole under a timestamp id. Cards are marked one at a time.
//! The session closes, producing its summary once, when the current card is
//! the last one or when no card is left unreviewed. A closed session accepts
//! no further marks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{apply_review, SchedulerError, SrsSettings};
use crate::domain::{CardStatus, Flashcard, ReviewRating};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
  pub total: usize,
  /// Cards that left the `new` status
  pub completed: usize,
  pub mastered: usize,
  pub reviewing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
  /// Seconds since the session started
  pub time_spent: i64,
  /// Whole seconds per card
  pub average_time: i64,
  /// Mastered share of all cards, 0-100
  pub completion_rate: f64,
  pub mastered: usize,
  pub reviewing: usize,
  pub total: usize,
}

/// Result of marking one card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
  pub stats: SessionStats,
  pub current_index: usize,
  /// Present once the last card has been marked
  pub summary: Option<SessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSession {
  pub id: String,
  pub user_id: String,
  #[serde(default)]
  pub subjects: Vec<String>,
  pub flashcards: Vec<Flashcard>,
  #[serde(default)]
  pub current_index: usize,
  pub created_at: DateTime<Utc>,
  pub started_at: DateTime<Utc>,
  pub last_updated: DateTime<Utc>,
  #[serde(default)]
  pub completed_at: Option<DateTime<Utc>>,
}

impl ReviewSession {
  pub fn new(
    user_id: impl Into<String>,
    subjects: Vec<String>,
    flashcards: Vec<Flashcard>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      id: now.timestamp_millis().to_string(),
      user_id: user_id.into(),
      subjects,
      flashcards,
      current_index: 0,
      created_at: now,
      started_at: now,
      last_updated: now,
      completed_at: None,
    }
  }

  pub fn is_complete(&self) -> bool {
    self.completed_at.is_some()
  }

  pub fn current(&self) -> Option<&Flashcard> {
    self.flashcards.get(self.current_index)
  }

  pub fn stats(&self) -> SessionStats {
    let mut stats = SessionStats {
      total: self.flashcards.len(),
      ..SessionStats::default()
    };
    for card in &self.flashcards {
      match card.status {
        CardStatus::New => {}
        CardStatus::Mastered => {
          stats.completed += 1;
          stats.mastered += 1;
        }
        CardStatus::Reviewing => {
          stats.completed += 1;
          stats.reviewing += 1;
        }
      }
    }
    stats
  }

  pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
    let stats = self.stats();
    let time_spent = (now - self.started_at).num_seconds().max(0);
    let (average_time, completion_rate) = if stats.total > 0 {
      (
        time_spent / stats.total as i64,
        stats.mastered as f64 / stats.total as f64 * 100.0,
      )
    } else {
      (0, 0.0)
    };

    SessionSummary {
      time_spent,
      average_time,
      completion_rate,
      mastered: stats.mastered,
      reviewing: stats.reviewing,
      total: stats.total,
    }
  }

  pub fn mark_card(
    &mut self,
    card_id: &str,
    rating: ReviewRating,
    now: DateTime<Utc>,
    settings: &SrsSettings,
  ) -> Result<MarkOutcome, SchedulerError> {
    if self.is_complete() {
      return Err(SchedulerError::SessionFinished);
    }
    let index = self
      .flashcards
      .iter()
      .position(|c| c.id == card_id)
      .ok_or_else(|| SchedulerError::CardNotFound(card_id.to_string()))?;

    apply_review(&mut self.flashcards[index], rating, now, settings)?;
    self.last_updated = now;

    let is_last = index + 1 == self.flashcards.len();
    let all_reviewed = self.flashcards.iter().all(|c| c.status != CardStatus::New);

    let summary = if all_reviewed || (is_last && self.current_index == index) {
      self.current_index = index;
      self.completed_at = Some(now);
      Some(self.summary(now))
    } else {
      self.current_index = if is_last {
        // Marked out of order: go back to the first card still waiting
        self
          .flashcards
          .iter()
          .position(|c| c.status == CardStatus::New)
          .unwrap_or(index)
      } else {
        index + 1
      };
      None
    };

    Ok(MarkOutcome {
      stats: self.stats(),
      current_index: self.current_index,
      summary,
    })
  }

  pub fn mark_current(
    &mut self,
    rating: ReviewRating,
    now: DateTime<Utc>,
    settings: &SrsSettings,
  ) -> Result<MarkOutcome, SchedulerError> {
    let card_id = self.current().map(|c| c.id.clone()).ok_or(SchedulerError::EmptySession)?;
    self.mark_card(&card_id, rating, now, settings)
  }

  pub fn next(&mut self) {
    if self.current_index + 1 < self.flashcards.len() {
      self.current_index += 1;
    }
  }

  pub fn previous(&mut self) {
    self.current_index = self.current_index.saturating_sub(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::srs::SchedulerKind;
  use chrono::Duration;

  fn settings() -> SrsSettings {
    SrsSettings {
      scheduler: SchedulerKind::Sm2,
      ..SrsSettings::default()
    }
  }

  fn cards(n: usize) -> Vec<Flashcard> {
    (0..n)
      .map(|i| Flashcard::new(format!("n1-{i}"), format!("Q{i}"), format!("A{i}")))
      .collect()
  }

  #[test]
  fn test_session_id_is_millisecond_timestamp() {
    let now = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.123Z")
      .unwrap()
      .with_timezone(&Utc);
    let session = ReviewSession::new("u1", vec![], cards(1), now);
    assert_eq!(session.id, "1714557600123");
  }

  #[test]
  fn test_stats_count_statuses() {
    let mut c = cards(4);
    c[0].status = CardStatus::Mastered;
    c[1].status = CardStatus::Reviewing;
    c[2].status = CardStatus::Mastered;
    let session = ReviewSession::new("u1", vec![], c, Utc::now());

    let stats = session.stats();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.completed, 3);
    assert_eq!(stats.mastered, 2);
    assert_eq!(stats.reviewing, 1);
  }

  #[test]
  fn test_marking_advances_until_last_card() {
    let start = Utc::now();
    let mut session = ReviewSession::new("u1", vec!["rust".into()], cards(3), start);

    let out = session.mark_current(ReviewRating::Good, start, &settings()).unwrap();
    assert!(out.summary.is_none());
    assert_eq!(out.current_index, 1);

    let out = session.mark_current(ReviewRating::Again, start, &settings()).unwrap();
    assert!(out.summary.is_none());
    assert_eq!(out.current_index, 2);

    let end = start + Duration::seconds(90);
    let out = session.mark_current(ReviewRating::Easy, end, &settings()).unwrap();
    let summary = out.summary.unwrap();
    assert_eq!(summary.time_spent, 90);
    assert_eq!(summary.average_time, 30);
    assert!((summary.completion_rate - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.mastered, 2);
    assert_eq!(summary.reviewing, 1);
    assert!(session.is_complete());
  }

  #[test]
  fn test_mark_card_by_id() {
    let now = Utc::now();
    let mut session = ReviewSession::new("u1", vec![], cards(3), now);
    let out = session.mark_card("n1-0", ReviewRating::Good, now, &settings()).unwrap();
    assert_eq!(out.stats.mastered, 1);
    assert_eq!(session.flashcards[0].review_count, 1);
    assert_eq!(session.flashcards[0].last_reviewed, Some(now));
  }

  #[test]
  fn test_mark_unknown_card() {
    let now = Utc::now();
    let mut session = ReviewSession::new("u1", vec![], cards(2), now);
    assert!(matches!(
      session.mark_card("nope", ReviewRating::Good, now, &settings()),
      Err(SchedulerError::CardNotFound(_))
    ));
  }

  #[test]
  fn test_empty_session() {
    let now = Utc::now();
    let mut session = ReviewSession::new("u1", vec![], vec![], now);
    let summary = session.summary(now + Duration::seconds(30));
    assert_eq!(summary.total, 0);
    assert_eq!(summary.average_time, 0);
    assert_eq!(summary.completion_rate, 0.0);
    assert!(matches!(
      session.mark_current(ReviewRating::Good, now, &settings()),
      Err(SchedulerError::EmptySession)
    ));
  }

  #[test]
  fn test_navigation_is_clamped() {
    let mut session = ReviewSession::new("u1", vec![], cards(2), Utc::now());
    session.previous();
    assert_eq!(session.current_index, 0);
    session.next();
    session.next();
    assert_eq!(session.current_index, 1);
    session.previous();
    assert_eq!(session.current().unwrap().id, "n1-0");
  }

  #[test]
  fn test_session_document_shape() {
    let session = ReviewSession::new("u1", vec!["math".into()], cards(1), Utc::now());
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["userId"], "u1");
    assert!(json.get("currentIndex").is_some());
    assert_eq!(json["flashcards"][0]["status"], "new");
  }

  #[test]
  fn test_average_time_is_floored() {
    let start = Utc::now();
    let session = ReviewSession::new("u1", vec![], cards(3), start);
    assert_eq!(session.summary(start + Duration::seconds(100)).average_time, 33);
  }

  #[test]
  fn test_last_card_out_of_order_does_not_finish() {
    let now = Utc::now();
    let mut session = ReviewSession::new("u1", vec![], cards(3), now);

    let out = session.mark_card("n1-2", ReviewRating::Good, now, &settings()).unwrap();
    assert!(out.summary.is_none());
    assert!(!session.is_complete());
    assert_eq!(out.current_index, 0);

    session.mark_current(ReviewRating::Good, now, &settings()).unwrap();
    let out = session.mark_current(ReviewRating::Again, now, &settings()).unwrap();
    let summary = out.summary.unwrap();
    assert_eq!(summary.mastered, 2);
    assert_eq!(summary.reviewing, 1);
    assert!(session.is_complete());
  }

  #[test]
  fn test_finished_session_rejects_marks() {
    let now = Utc::now();
    let mut session = ReviewSession::new("u1", vec![], cards(1), now);
    assert!(session.mark_current(ReviewRating::Good, now, &settings()).unwrap().summary.is_some());

    assert!(matches!(
      session.mark_current(ReviewRating::Good, now, &settings()),
      Err(SchedulerError::SessionFinished)
    ));
    assert!(matches!(
      session.mark_card("n1-0", ReviewRating::Again, now, &settings()),
      Err(SchedulerError::SessionFinished)
    ));
    assert_eq!(session.flashcards[0].review_count, 1);
  }
}
