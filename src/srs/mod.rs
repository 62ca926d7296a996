pub mod fsrs_scheduler;
pub mod session;
pub mod sm2;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::domain::{Flashcard, ReviewRating};

pub use session::{MarkOutcome, ReviewSession, SessionStats, SessionSummary};

/// Which algorithm schedules graduated cards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
  Sm2,
  Fsrs,
}

#[derive(Debug, Clone)]
pub struct SrsSettings {
  pub scheduler: SchedulerKind,
  pub desired_retention: f64,
  pub focus_mode: bool,
}

impl Default for SrsSettings {
  fn default() -> Self {
    Self {
      scheduler: SchedulerKind::Fsrs,
      desired_retention: crate::config::DEFAULT_DESIRED_RETENTION,
      focus_mode: false,
    }
  }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
  #[error("FSRS scheduling failed: {0}")]
  Fsrs(String),
  #[error("card not found: {0}")]
  CardNotFound(String),
  #[error("session has no cards")]
  EmptySession,
  #[error("session is already finished")]
  SessionFinished,
  #[error("review interval of {0} days is out of range")]
  IntervalOutOfRange(i64),
}

/// `now` plus a whole number of days, without overflowing the calendar
pub(crate) fn days_after(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, SchedulerError> {
  TimeDelta::try_days(days)
    .and_then(|delta| now.checked_add_signed(delta))
    .ok_or(SchedulerError::IntervalOutOfRange(days))
}

/// Scheduling fields computed for one review
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSchedule {
  pub next_review: DateTime<Utc>,
  pub ease_factor: f64,
  pub interval_days: i64,
  pub repetitions: i64,
  pub learning_step: i64,
  pub stability: Option<f64>,
  pub difficulty: Option<f64>,
}

pub fn calculate_next_review(
  card: &Flashcard,
  rating: ReviewRating,
  now: DateTime<Utc>,
  settings: &SrsSettings,
) -> Result<ReviewSchedule, SchedulerError> {
  match settings.scheduler {
    SchedulerKind::Sm2 => sm2::schedule(card, rating, now),
    SchedulerKind::Fsrs => fsrs_scheduler::schedule(card, rating, now, settings),
  }
}

/// Apply a review to the card in place
pub fn apply_review(
  card: &mut Flashcard,
  rating: ReviewRating,
  now: DateTime<Utc>,
  settings: &SrsSettings,
) -> Result<(), SchedulerError> {
  let schedule = calculate_next_review(card, rating, now, settings)?;

  card.status = rating.resulting_status();
  card.last_reviewed = Some(now);
  card.review_count = card.review_count.saturating_add(1);
  card.next_review = Some(schedule.next_review);
  card.ease_factor = schedule.ease_factor;
  card.interval_days = schedule.interval_days;
  card.repetitions = schedule.repetitions;
  card.learning_step = schedule.learning_step;
  card.fsrs_stability = schedule.stability;
  card.fsrs_difficulty = schedule.difficulty;

  tracing::debug!(
    "Reviewed card {} as {:?}, next review {}",
    card.id,
    rating,
    schedule.next_review
  );
  Ok(())
}

/// Cards that are new or past their review time, in their original order
pub fn due_cards(cards: &[Flashcard], now: DateTime<Utc>) -> Vec<&Flashcard> {
  cards.iter().filter(|c| c.is_due(now)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::CardStatus;
  use chrono::Duration;

  fn sm2_settings() -> SrsSettings {
    SrsSettings {
      scheduler: SchedulerKind::Sm2,
      ..SrsSettings::default()
    }
  }

  #[test]
  fn test_dispatch_by_scheduler() {
    let now = Utc::now();
    let card = Flashcard::new("c1".into(), "Q".into(), "A".into());

    let sm2 = calculate_next_review(&card, ReviewRating::Good, now, &sm2_settings()).unwrap();
    assert_eq!(sm2.next_review, now + Duration::days(1));

    let fsrs = calculate_next_review(&card, ReviewRating::Good, now, &SrsSettings::default()).unwrap();
    assert_eq!(fsrs.next_review, now + Duration::minutes(10));
  }

  #[test]
  fn test_apply_review_updates_card() {
    let now = Utc::now();
    let mut card = Flashcard::new("c1".into(), "Q".into(), "A".into());

    apply_review(&mut card, ReviewRating::Good, now, &sm2_settings()).unwrap();
    assert_eq!(card.status, CardStatus::Mastered);
    assert_eq!(card.review_count, 1);
    assert_eq!(card.last_reviewed, Some(now));
    assert_eq!(card.repetitions, 1);

    apply_review(&mut card, ReviewRating::Again, now, &sm2_settings()).unwrap();
    assert_eq!(card.status, CardStatus::Reviewing);
    assert_eq!(card.review_count, 2);
    assert_eq!(card.repetitions, 0);
  }

  #[test]
  fn test_due_cards() {
    let now = Utc::now();
    let fresh = Flashcard::new("a".into(), "Q".into(), "A".into());
    let mut later = Flashcard::new("b".into(), "Q".into(), "A".into());
    later.next_review = Some(now + Duration::days(2));
    let mut overdue = Flashcard::new("c".into(), "Q".into(), "A".into());
    overdue.next_review = Some(now - Duration::hours(1));

    let cards = vec![fresh, later, overdue];
    let due: Vec<_> = due_cards(&cards, now).iter().map(|c| c.id.as_str()).collect();
    assert_eq!(due, vec!["a", "c"]);
  }

  #[test]
  fn test_days_after_rejects_overflow() {
    let now = Utc::now();
    assert_eq!(days_after(now, 3).unwrap(), now + Duration::days(3));
    assert!(matches!(
      days_after(now, i64::MAX / 2),
      Err(SchedulerError::IntervalOutOfRange(_))
    ));
  }
}
