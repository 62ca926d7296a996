//! Local answer checking, used when the model cannot grade an answer.
//!
//! Answers are compared after folding case, accents and punctuation. Word
//! order does not matter and small typos are tolerated.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::classify::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMatch {
  /// Same words after normalization
  Exact,
  /// Within typo tolerance
  CloseEnough,
  Incorrect,
}

impl AnswerMatch {
  pub fn is_correct(&self) -> bool {
    !matches!(self, Self::Incorrect)
  }

  /// Accuracy reported for a locally graded answer, 0-100
  pub fn accuracy(&self) -> f64 {
    match self {
      Self::Exact => 100.0,
      Self::CloseEnough => 90.0,
      Self::Incorrect => 0.0,
    }
  }
}

/// Normalize an answer for comparison
/// - Folds case and accents
/// - Removes punctuation
/// - Collapses whitespace
fn normalize_answer(input: &str) -> String {
  fold(input)
    .chars()
    .map(|c| if c.is_alphanumeric() { c } else { ' ' })
    .collect::<String>()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

fn same_words(a: &str, b: &str) -> bool {
  let a: HashSet<&str> = a.split_whitespace().collect();
  let b: HashSet<&str> = b.split_whitespace().collect();
  !a.is_empty() && a == b
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr = vec![0usize; b.len() + 1];
  for i in 1..=a.len() {
    curr[0] = i;
    for j in 1..=b.len() {
      let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }
  prev[b.len()]
}

pub fn compare_answers(given: &str, expected: &str) -> AnswerMatch {
  let given = normalize_answer(given);
  let expected = normalize_answer(expected);
  if given.is_empty() || expected.is_empty() {
    return AnswerMatch::Incorrect;
  }

  if given == expected || same_words(&given, &expected) {
    return AnswerMatch::Exact;
  }

  let max_distance = match expected.chars().count() {
    0..=2 => 0, // "si", "no" must be exact
    3..=4 => 1,
    _ => 2,
  };
  if levenshtein_distance(&given, &expected) <= max_distance {
    return AnswerMatch::CloseEnough;
  }

  AnswerMatch::Incorrect
}
