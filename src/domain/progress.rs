use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::srs::SessionSummary;

/// Summary of a finished flashcard session, kept as progress history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
  pub session_id: String,
  #[serde(default)]
  pub subjects: Vec<String>,
  pub summary: SessionSummary,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
  pub timestamp: DateTime<Utc>,
  /// Percentage, 0-100
  pub score: f64,
  pub total_questions: u32,
  pub correct_answers: u32,
  #[serde(default)]
  pub incorrect_answers: u32,
  #[serde(default)]
  pub topic: Option<String>,
}

impl QuizResult {
  pub fn new(
    timestamp: DateTime<Utc>,
    total_questions: u32,
    correct_answers: u32,
    topic: Option<String>,
  ) -> Self {
    let correct_answers = correct_answers.min(total_questions);
    let score = if total_questions > 0 {
      correct_answers as f64 / total_questions as f64 * 100.0
    } else {
      0.0
    };
    Self {
      timestamp,
      score,
      total_questions,
      correct_answers,
      incorrect_answers: total_questions - correct_answers,
      topic,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
  pub average_score: f64,
  pub total_quizzes: usize,
  pub total_questions: u64,
}

/// Sort newest first and drop entries recorded within the dedupe window of
/// an entry that precedes them in that order.
pub fn dedupe_quiz_history(mut history: Vec<QuizResult>) -> Vec<QuizResult> {
  history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

  let mut kept: Vec<QuizResult> = Vec::with_capacity(history.len());
  let mut seen: Vec<DateTime<Utc>> = Vec::with_capacity(history.len());
  for quiz in history {
    let duplicate = seen.iter().any(|t| {
      (*t - quiz.timestamp).num_milliseconds().abs() < config::QUIZ_DEDUPE_WINDOW_MS
    });
    seen.push(quiz.timestamp);
    if !duplicate {
      kept.push(quiz);
    }
  }
  kept
}

pub fn quiz_stats(history: &[QuizResult]) -> QuizStats {
  if history.is_empty() {
    return QuizStats::default();
  }
  let total_score: f64 = history.iter().map(|q| q.score).sum();
  QuizStats {
    average_score: total_score / history.len() as f64,
    total_quizzes: history.len(),
    total_questions: history.iter().map(|q| q.total_questions as u64).sum(),
  }
}
