use chrono::{DateTime, Utc};

use super::{days_after, ReviewSchedule, SchedulerError};
use crate::config::{MAX_INTERVAL_DAYS, MIN_EASE_FACTOR};
use crate::domain::{Flashcard, ReviewRating};

pub struct Sm2Result {
  pub ease_factor: f64,
  pub interval_days: i64,
  pub repetitions: i64,
  pub next_review: DateTime<Utc>,
}

pub fn calculate_sm2(
  quality: u8,
  current_ease_factor: f64,
  current_interval: i64,
  current_repetitions: i64,
  now: DateTime<Utc>,
) -> Result<Sm2Result, SchedulerError> {
  let q = quality as f64;

  // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
  let ease_delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
  let new_ease_factor = (current_ease_factor + ease_delta).max(MIN_EASE_FACTOR);

  let (new_interval, new_repetitions) = if quality < 3 {
    // Failed review: reset
    (1, 0)
  } else {
    let interval = match current_repetitions {
      i64::MIN..=0 => 1,
      1 => 6,
      _ => {
        // Float-to-int casts saturate, so the clamp bounds any stored interval
        let interval = ((current_interval as f64) * new_ease_factor).round() as i64;
        interval.clamp(1, MAX_INTERVAL_DAYS)
      }
    };
    (interval, current_repetitions.max(0).saturating_add(1))
  };

  Ok(Sm2Result {
    ease_factor: new_ease_factor,
    interval_days: new_interval,
    repetitions: new_repetitions,
    next_review: days_after(now, new_interval)?,
  })
}

/// Schedule a flashcard with plain SM-2. Learning steps and FSRS memory are
/// left untouched.
pub fn schedule(
  card: &Flashcard,
  rating: ReviewRating,
  now: DateTime<Utc>,
) -> Result<ReviewSchedule, SchedulerError> {
  let result = calculate_sm2(
    rating.quality(),
    card.ease_factor,
    card.interval_days,
    card.repetitions,
    now,
  )?;

  Ok(ReviewSchedule {
    next_review: result.next_review,
    ease_factor: result.ease_factor,
    interval_days: result.interval_days,
    repetitions: result.repetitions,
    learning_step: card.learning_step,
    stability: card.fsrs_stability,
    difficulty: card.fsrs_difficulty,
  })
}
