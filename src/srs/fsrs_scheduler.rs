use chrono::{DateTime, Duration, Utc};
use fsrs::{MemoryState, FSRS, DEFAULT_PARAMETERS};

use super::{days_after, ReviewSchedule, SchedulerError, SrsSettings};
use crate::config::{self, GRADUATING_STEP, MAX_INTERVAL_DAYS};
use crate::domain::{Flashcard, ReviewRating};

/// Calculate next review using hybrid learning steps + FSRS algorithm
///
/// For cards in learning phase (learning_step < 4):
///   - Normal mode: 1min, 10min, 1hr, 4hr
///   - Focus mode: 1min, 5min, 15min, 30min
///   - Failure resets to step 0, success advances one step
///   - After step 3, graduates to FSRS (step 4)
///
/// For graduated cards, FSRS picks the interval. A failure sends the card
/// back to step 0 while keeping its memory state.
pub fn schedule(
  card: &Flashcard,
  rating: ReviewRating,
  now: DateTime<Utc>,
  settings: &SrsSettings,
) -> Result<ReviewSchedule, SchedulerError> {
  let is_correct = rating.quality() >= 2;
  let learning_steps = config::get_learning_steps(settings.focus_mode);

  if card.learning_step < GRADUATING_STEP {
    return learning_phase(card, rating, is_correct, now, learning_steps);
  }

  if !is_correct {
    return Ok(return_to_learning(card, now, learning_steps));
  }

  graduated(card, rating, now, settings.desired_retention)
}

fn fsrs() -> Result<FSRS, SchedulerError> {
  FSRS::new(Some(&DEFAULT_PARAMETERS)).map_err(|e| SchedulerError::Fsrs(e.to_string()))
}

fn learning_phase(
  card: &Flashcard,
  rating: ReviewRating,
  is_correct: bool,
  now: DateTime<Utc>,
  learning_steps: &[i64; 4],
) -> Result<ReviewSchedule, SchedulerError> {
  if !is_correct {
    return Ok(ReviewSchedule {
      next_review: now + Duration::minutes(learning_steps[0]),
      ease_factor: card.ease_factor,
      interval_days: 0,
      repetitions: 0,
      learning_step: 0,
      stability: card.fsrs_stability,
      difficulty: card.fsrs_difficulty,
    });
  }

  let next_step = card.learning_step.max(0) + 1;

  if next_step < GRADUATING_STEP {
    return Ok(ReviewSchedule {
      next_review: now + Duration::minutes(learning_steps[next_step as usize]),
      ease_factor: card.ease_factor,
      interval_days: 0,
      repetitions: 0, // Still learning, not counted as repetition
      learning_step: next_step,
      stability: card.fsrs_stability,
      difficulty: card.fsrs_difficulty,
    });
  }

  // Graduating: seed FSRS memory with a 1-day first interval
  let next_states = fsrs()?
    .next_states(None, config::DEFAULT_DESIRED_RETENTION as f32, 0)
    .map_err(|e| SchedulerError::Fsrs(e.to_string()))?;
  let seeded = match rating {
    ReviewRating::Easy => &next_states.easy,
    _ => &next_states.good,
  };

  Ok(ReviewSchedule {
    next_review: days_after(now, 1)?,
    ease_factor: card.ease_factor,
    interval_days: 1,
    repetitions: 1,
    learning_step: GRADUATING_STEP,
    stability: Some(seeded.memory.stability as f64),
    difficulty: Some(seeded.memory.difficulty as f64),
  })
}

fn return_to_learning(
  card: &Flashcard,
  now: DateTime<Utc>,
  learning_steps: &[i64; 4],
) -> ReviewSchedule {
  ReviewSchedule {
    next_review: now + Duration::minutes(learning_steps[0]),
    ease_factor: card.ease_factor,
    interval_days: 0,
    repetitions: 0,
    learning_step: 0,
    // Memory state is refreshed when the card graduates again
    stability: card.fsrs_stability,
    difficulty: card.fsrs_difficulty,
  }
}

fn graduated(
  card: &Flashcard,
  rating: ReviewRating,
  now: DateTime<Utc>,
  desired_retention: f64,
) -> Result<ReviewSchedule, SchedulerError> {
  let current_memory = match (card.fsrs_stability, card.fsrs_difficulty) {
    (Some(stability), Some(difficulty)) if is_valid_memory(stability, difficulty) => Some(MemoryState {
      stability: stability as f32,
      difficulty: difficulty as f32,
    }),
    _ => None,
  };

  let elapsed_days = card
    .last_reviewed
    .map(|last| (now - last).num_days().max(0) as u32)
    .unwrap_or(0);

  let next_states = fsrs()?
    .next_states(current_memory, desired_retention as f32, elapsed_days)
    .map_err(|e| SchedulerError::Fsrs(e.to_string()))?;

  let scheduled = match rating {
    ReviewRating::Hard => &next_states.hard,
    ReviewRating::Easy => &next_states.easy,
    _ => &next_states.good,
  };

  let interval_days = (scheduled.interval.round() as i64).clamp(1, MAX_INTERVAL_DAYS);

  Ok(ReviewSchedule {
    next_review: days_after(now, interval_days)?,
    ease_factor: card.ease_factor,
    interval_days,
    repetitions: card.repetitions.max(0).saturating_add(1),
    learning_step: card.learning_step,
    stability: Some(scheduled.memory.stability as f64),
    difficulty: Some(scheduled.memory.difficulty as f64),
  })
}

/// Stored memory state that FSRS can continue from
fn is_valid_memory(stability: f64, difficulty: f64) -> bool {
  stability.is_finite() && stability > 0.0 && (1.0..=10.0).contains(&difficulty)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::srs::SchedulerKind;

  fn settings(focus_mode: bool) -> SrsSettings {
    SrsSettings {
      scheduler: SchedulerKind::Fsrs,
      desired_retention: 0.9,
      focus_mode,
    }
  }

  fn card() -> Flashcard {
    Flashcard::new("c1".into(), "What does `?` do?".into(), "Propagates errors".into())
  }

  #[test]
  fn test_new_card_advances_one_step() {
    let now = Utc::now();
    let s = schedule(&card(), ReviewRating::Good, now, &settings(false)).unwrap();
    assert_eq!(s.learning_step, 1);
    assert_eq!(s.repetitions, 0);
    assert_eq!(s.next_review, now + Duration::minutes(10));
  }

  #[test]
  fn test_focus_mode_uses_short_steps() {
    let now = Utc::now();
    let s = schedule(&card(), ReviewRating::Good, now, &settings(true)).unwrap();
    assert_eq!(s.next_review, now + Duration::minutes(5));
  }

  #[test]
  fn test_learning_failure_resets() {
    let now = Utc::now();
    let mut c = card();
    c.learning_step = 2;
    let s = schedule(&c, ReviewRating::Again, now, &settings(false)).unwrap();
    assert_eq!(s.learning_step, 0);
    assert_eq!(s.next_review, now + Duration::minutes(1));
  }

  #[test]
  fn test_graduation_seeds_memory() {
    let now = Utc::now();
    let mut c = card();
    c.learning_step = 3;
    let s = schedule(&c, ReviewRating::Good, now, &settings(false)).unwrap();
    assert_eq!(s.learning_step, GRADUATING_STEP);
    assert_eq!(s.repetitions, 1);
    assert_eq!(s.next_review, now + Duration::days(1));
    assert!(s.stability.unwrap() > 0.0);
    assert!(s.difficulty.unwrap() > 0.0);
  }

  #[test]
  fn test_graduated_card_uses_fsrs() {
    let now = Utc::now();
    let mut c = card();
    c.learning_step = 4;
    c.repetitions = 1;
    c.fsrs_stability = Some(5.0);
    c.fsrs_difficulty = Some(5.0);
    c.last_reviewed = Some(now - Duration::days(5));

    let s = schedule(&c, ReviewRating::Good, now, &settings(false)).unwrap();
    assert_eq!(s.learning_step, 4);
    assert_eq!(s.repetitions, 2);
    assert!(s.interval_days >= 1);
    assert!(s.next_review >= now + Duration::days(1));
  }

  #[test]
  fn test_graduated_failure_returns_to_learning() {
    let now = Utc::now();
    let mut c = card();
    c.learning_step = 4;
    c.repetitions = 5;
    c.fsrs_stability = Some(10.0);
    c.fsrs_difficulty = Some(5.0);

    let s = schedule(&c, ReviewRating::Again, now, &settings(false)).unwrap();
    assert_eq!(s.learning_step, 0);
    assert_eq!(s.repetitions, 0);
    assert_eq!(s.stability, Some(10.0));
    assert_eq!(s.next_review, now + Duration::minutes(1));
  }

  #[test]
  fn test_negative_learning_step_restarts_steps() {
    let now = Utc::now();
    let mut c = card();
    c.learning_step = -2;
    let s = schedule(&c, ReviewRating::Good, now, &settings(false)).unwrap();
    assert_eq!(s.learning_step, 1);
    assert_eq!(s.next_review, now + Duration::minutes(10));
  }

  #[test]
  fn test_corrupt_memory_is_reseeded() {
    let now = Utc::now();
    let mut c = card();
    c.learning_step = 9;
    c.repetitions = i64::MAX;
    c.fsrs_stability = Some(f64::NAN);
    c.fsrs_difficulty = Some(-3.0);

    let s = schedule(&c, ReviewRating::Easy, now, &settings(false)).unwrap();
    assert_eq!(s.repetitions, i64::MAX);
    assert!(s.stability.unwrap().is_finite());
    assert!(s.interval_days >= 1 && s.interval_days <= MAX_INTERVAL_DAYS);
  }
}
