use serde::{Deserialize, Serialize};

use super::flashcard::CardStatus;

/// How well the learner recalled a card.
/// Values are SM-2 quality grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRating {
  Again = 0,
  Hard = 2,
  Good = 4,
  Easy = 5,
}

impl ReviewRating {
  pub fn quality(&self) -> u8 {
    *self as u8
  }

  /// Rating implied by the two-button review UI ("mastered" / "still reviewing")
  pub fn from_status(status: CardStatus) -> Option<Self> {
    match status {
      CardStatus::Mastered => Some(Self::Good),
      CardStatus::Reviewing => Some(Self::Again),
      CardStatus::New => None,
    }
  }

  /// Card status after a review with this rating
  pub fn resulting_status(&self) -> CardStatus {
    match self {
      Self::Good | Self::Easy => CardStatus::Mastered,
      Self::Again | Self::Hard => CardStatus::Reviewing,
    }
  }
}

/// Question difficulty bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rating_from_status() {
    assert_eq!(ReviewRating::from_status(CardStatus::Mastered), Some(ReviewRating::Good));
    assert_eq!(ReviewRating::from_status(CardStatus::Reviewing), Some(ReviewRating::Again));
    assert_eq!(ReviewRating::from_status(CardStatus::New), None);
  }

  #[test]
  fn test_resulting_status() {
    assert_eq!(ReviewRating::Again.resulting_status(), CardStatus::Reviewing);
    assert_eq!(ReviewRating::Hard.resulting_status(), CardStatus::Reviewing);
    assert_eq!(ReviewRating::Good.resulting_status(), CardStatus::Mastered);
    assert_eq!(ReviewRating::Easy.resulting_status(), CardStatus::Mastered);
  }

  #[test]
  fn test_rating_serde() {
    let rating: ReviewRating = serde_json::from_str("\"good\"").unwrap();
    assert_eq!(rating, ReviewRating::Good);
    assert_eq!(serde_json::to_string(&ReviewRating::Again).unwrap(), "\"again\"");
  }

  #[test]
  fn test_difficulty_serde_lowercase() {
    assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "\"hard\"");
    let d: Difficulty = serde_json::from_str("\"easy\"").unwrap();
    assert_eq!(d, Difficulty::Easy);
  }
}
