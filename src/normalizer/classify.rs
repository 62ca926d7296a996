//! Heuristic labelling of questions and answers: difficulty buckets, topic
//! attribution and the preference signals recorded into learning metrics.

use std::collections::HashSet;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use super::response::StructuredResponse;
use crate::config;
use crate::domain::metrics::{ExplanationLength, LearningStyle};
use crate::domain::Difficulty;

static EASY_LABELS: &[&str] = &["easy", "facil", "basic", "basico", "beginner", "principiante", "low", "bajo"];

static MEDIUM_LABELS: &[&str] = &[
  "medium",
  "medio",
  "media",
  "intermediate",
  "intermedio",
  "moderate",
  "moderado",
];

static HARD_LABELS: &[&str] = &["hard", "dificil", "advanced", "avanzado", "expert", "experto", "high", "alto"];

/// Lowercase and strip diacritics ("Básico" -> "basico")
pub fn fold(text: &str) -> String {
  text
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .collect::<String>()
    .to_lowercase()
}

fn tokens(text: &str) -> Vec<String> {
  fold(text)
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

fn word_count(text: &str) -> usize {
  text.split_whitespace().count()
}

/// Map a free-form difficulty or course-level label to a bucket
pub fn classify_difficulty(label: &str) -> Option<Difficulty> {
  for token in tokens(label) {
    if EASY_LABELS.contains(&token.as_str()) {
      return Some(Difficulty::Easy);
    }
    if MEDIUM_LABELS.contains(&token.as_str()) {
      return Some(Difficulty::Medium);
    }
    if HARD_LABELS.contains(&token.as_str()) {
      return Some(Difficulty::Hard);
    }
  }
  None
}

/// Guess a card's difficulty from how long its answer is
pub fn estimate_difficulty(_front: &str, back: &str) -> Difficulty {
  match word_count(back) {
    n if n <= config::EASY_MAX_WORDS => Difficulty::Easy,
    n if n <= config::MEDIUM_MAX_WORDS => Difficulty::Medium,
    _ => Difficulty::Hard,
  }
}

/// Pick the known topic sharing the most words with `text`.
///
/// Short words (under three letters) are ignored unless a topic has nothing
/// else. Ties go to the earliest topic; no overlap means no topic.
pub fn attribute_topic<'a>(text: &str, known_topics: &'a [String]) -> Option<&'a str> {
  let words: HashSet<String> = tokens(text).into_iter().collect();
  if words.is_empty() {
    return None;
  }

  let mut best: Option<(&str, usize)> = None;
  for topic in known_topics {
    let all = tokens(topic);
    let significant: Vec<&String> = all.iter().filter(|t| t.chars().count() >= 3).collect();
    let candidates: Vec<&String> = if significant.is_empty() {
      all.iter().collect()
    } else {
      significant
    };

    let score = candidates.iter().filter(|t| words.contains(t.as_str())).count();
    if score > 0 && best.is_none_or(|(_, top)| score > top) {
      best = Some((topic.as_str(), score));
    }
  }
  best.map(|(topic, _)| topic)
}

pub fn explanation_length(text: &str) -> ExplanationLength {
  match word_count(text) {
    n if n <= config::SHORT_EXPLANATION_WORDS => ExplanationLength::Short,
    n if n <= config::MEDIUM_EXPLANATION_WORDS => ExplanationLength::Medium,
    _ => ExplanationLength::Long,
  }
}

pub fn learning_style(response: &StructuredResponse) -> LearningStyle {
  if response.code.is_some() || !response.steps.is_empty() {
    LearningStyle::Practical
  } else if response.example.is_some() {
    LearningStyle::Visual
  } else {
    LearningStyle::Textual
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalizer::Step;

  #[test]
  fn test_fold() {
    assert_eq!(fold("Básico"), "basico");
    assert_eq!(fold("DIFÍCIL"), "dificil");
    assert_eq!(fold("Ñandú"), "nandu");
  }

  #[test]
  fn test_classify_difficulty_labels() {
    assert_eq!(classify_difficulty("easy"), Some(Difficulty::Easy));
    assert_eq!(classify_difficulty("Fácil"), Some(Difficulty::Easy));
    assert_eq!(classify_difficulty("Principiante"), Some(Difficulty::Easy));
    assert_eq!(classify_difficulty("Intermedio"), Some(Difficulty::Medium));
    assert_eq!(classify_difficulty("Nivel: Avanzado"), Some(Difficulty::Hard));
    assert_eq!(classify_difficulty("Difícil"), Some(Difficulty::Hard));
    assert_eq!(classify_difficulty("whatever"), None);
    assert_eq!(classify_difficulty(""), None);
  }

  #[test]
  fn test_estimate_difficulty_by_answer_length() {
    assert_eq!(estimate_difficulty("Q", "A short answer"), Difficulty::Easy);
    let medium = "word ".repeat(config::EASY_MAX_WORDS + 1);
    assert_eq!(estimate_difficulty("Q", &medium), Difficulty::Medium);
    let hard = "word ".repeat(config::MEDIUM_MAX_WORDS + 1);
    assert_eq!(estimate_difficulty("Q", &hard), Difficulty::Hard);
  }

  #[test]
  fn test_attribute_topic() {
    let topics = vec![
      "Ownership and borrowing".to_string(),
      "Error handling".to_string(),
      "Traits".to_string(),
    ];
    assert_eq!(
      attribute_topic("How does error propagation with ? work in handling code", &topics),
      Some("Error handling")
    );
    assert_eq!(attribute_topic("what are TRAITS", &topics), Some("Traits"));
    assert_eq!(attribute_topic("tell me about closures", &topics), None);
    assert_eq!(attribute_topic("", &topics), None);
  }

  #[test]
  fn test_attribute_topic_ties_and_accents() {
    let topics = vec!["Funciones".to_string(), "Funciones avanzadas".to_string()];
    // One shared word each: earliest wins
    assert_eq!(attribute_topic("las funciones", &topics), Some("Funciones"));
    assert_eq!(attribute_topic("funciones avanzadas", &topics), Some("Funciones avanzadas"));

    let accented = vec!["Programación".to_string()];
    assert_eq!(attribute_topic("intro a la programacion", &accented), Some("Programación"));
  }

  #[test]
  fn test_explanation_length() {
    assert_eq!(explanation_length("short"), ExplanationLength::Short);
    let medium = "w ".repeat(config::SHORT_EXPLANATION_WORDS + 1);
    assert_eq!(explanation_length(&medium), ExplanationLength::Medium);
    let long = "w ".repeat(config::MEDIUM_EXPLANATION_WORDS + 1);
    assert_eq!(explanation_length(&long), ExplanationLength::Long);
  }

  #[test]
  fn test_learning_style() {
    let mut r = StructuredResponse::fallback("text");
    assert_eq!(learning_style(&r), LearningStyle::Textual);

    r.example = Some("e.g.".into());
    assert_eq!(learning_style(&r), LearningStyle::Visual);

    r.steps.push(Step::default());
    assert_eq!(learning_style(&r), LearningStyle::Practical);
  }
}
