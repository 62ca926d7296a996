//! In-memory chat state for the course assistant.
//!
//! Holds the exam question the assistant last asked each learner, so the
//! learner's next message can be graded against it. Entries expire after a
//! period of inactivity.

use crate::config;
use crate::normalizer::ExamQuestion;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Chat entry with last access time for expiration
struct ChatEntry {
  pending_exam: Option<ExamQuestion>,
  last_access: DateTime<Utc>,
}

/// Per-user chat state, keyed by user id
#[derive(Default)]
pub struct ChatSessions {
  entries: Mutex<HashMap<String, ChatEntry>>,
}

impl ChatSessions {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, ChatEntry>> {
    // Entries are plain data; a panic mid-update cannot leave them inconsistent
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

    // Clean up expired entries occasionally (~10% chance)
    if rand::random::<u8>() < config::CHAT_SESSION_CLEANUP_THRESHOLD {
      cleanup_expired(&mut entries, Utc::now());
    }
    entries
  }

  /// Remember the question the learner is expected to answer next
  pub fn set_pending_exam(&self, user_id: &str, exam: ExamQuestion, now: DateTime<Utc>) {
    self.lock().insert(
      user_id.to_string(),
      ChatEntry {
        pending_exam: Some(exam),
        last_access: now,
      },
    );
  }

  /// Take the pending question, if any and not expired. The question is
  /// removed: each one is graded once.
  pub fn take_pending_exam(&self, user_id: &str, now: DateTime<Utc>) -> Option<ExamQuestion> {
    let mut entries = self.lock();
    let entry = entries.get_mut(user_id)?;
    if is_expired(entry, now) {
      entries.remove(user_id);
      return None;
    }
    entry.last_access = now;
    entry.pending_exam.take()
  }
}

fn is_expired(entry: &ChatEntry, now: DateTime<Utc>) -> bool {
  entry.last_access <= now - Duration::hours(config::CHAT_SESSION_EXPIRY_HOURS)
}

/// Clean up expired entries
fn cleanup_expired(entries: &mut HashMap<String, ChatEntry>, now: DateTime<Utc>) {
  entries.retain(|_, entry| !is_expired(entry, now));
}
