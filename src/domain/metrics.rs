//! Per-user learning metrics.
//!
//! The whole record is one document: it is loaded, mutated by the owning
//! user's session and written back wholesale. Every counter only grows.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::review::Difficulty;
use crate::config;

#[derive(Debug, Error)]
pub enum MetricsError {
  #[error("invalid metrics document: missing userId")]
  MissingUserId,
  #[error("invalid metrics document: {0}")]
  Malformed(#[from] serde_json::Error),
}

/// Correct/total pair used for difficulty and topic accuracy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tally {
  pub correct: u64,
  pub total: u64,
}

impl Tally {
  pub fn record(&mut self, is_correct: bool) {
    self.total += 1;
    if is_correct {
      self.correct += 1;
    }
  }

  pub fn accuracy(&self) -> f64 {
    if self.total > 0 {
      self.correct as f64 / self.total as f64
    } else {
      0.0
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyLevels {
  pub easy: Tally,
  pub medium: Tally,
  pub hard: Tally,
}

impl DifficultyLevels {
  pub fn get(&self, difficulty: Difficulty) -> &Tally {
    match difficulty {
      Difficulty::Easy => &self.easy,
      Difficulty::Medium => &self.medium,
      Difficulty::Hard => &self.hard,
    }
  }

  fn get_mut(&mut self, difficulty: Difficulty) -> &mut Tally {
    match difficulty {
      Difficulty::Easy => &mut self.easy,
      Difficulty::Medium => &mut self.medium,
      Difficulty::Hard => &mut self.hard,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Performance {
  pub correct_answers: u64,
  pub total_answers: u64,
  /// Seconds
  pub average_response_time: f64,
  /// Seconds
  pub total_response_time: f64,
  pub difficulty_levels: DifficultyLevels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
  pub date: DateTime<Utc>,
  pub topic: String,
  pub score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
  pub mastered_topics: Vec<String>,
  pub improvement_needed: Vec<String>,
  pub timeline: Vec<TimelineEntry>,
}

/// Part of the day a session started in (learner's local time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
  Morning,
  Afternoon,
  Evening,
  Night,
}

impl DayPart {
  pub const ALL: [DayPart; 4] = [Self::Morning, Self::Afternoon, Self::Evening, Self::Night];

  /// 05-11 morning, 12-16 afternoon, 17-20 evening, anything else night
  pub fn from_hour(hour: u32) -> Self {
    match hour {
      5..=11 => Self::Morning,
      12..=16 => Self::Afternoon,
      17..=20 => Self::Evening,
      _ => Self::Night,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Morning => "morning",
      Self::Afternoon => "afternoon",
      Self::Evening => "evening",
      Self::Night => "night",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOfDay {
  pub morning: u64,
  pub afternoon: u64,
  pub evening: u64,
  pub night: u64,
}

impl TimeOfDay {
  pub fn get(&self, part: DayPart) -> u64 {
    match part {
      DayPart::Morning => self.morning,
      DayPart::Afternoon => self.afternoon,
      DayPart::Evening => self.evening,
      DayPart::Night => self.night,
    }
  }

  fn increment(&mut self, part: DayPart) {
    match part {
      DayPart::Morning => self.morning += 1,
      DayPart::Afternoon => self.afternoon += 1,
      DayPart::Evening => self.evening += 1,
      DayPart::Night => self.night += 1,
    }
  }

  /// Bucket with the most sessions; ties go to the earlier part of the day
  pub fn preferred(&self) -> DayPart {
    let mut best = DayPart::Morning;
    for part in DayPart::ALL {
      if self.get(part) > self.get(best) {
        best = part;
      }
    }
    best
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaysOfWeek {
  pub monday: u64,
  pub tuesday: u64,
  pub wednesday: u64,
  pub thursday: u64,
  pub friday: u64,
  pub saturday: u64,
  pub sunday: u64,
}

impl DaysOfWeek {
  pub fn get(&self, day: Weekday) -> u64 {
    match day {
      Weekday::Mon => self.monday,
      Weekday::Tue => self.tuesday,
      Weekday::Wed => self.wednesday,
      Weekday::Thu => self.thursday,
      Weekday::Fri => self.friday,
      Weekday::Sat => self.saturday,
      Weekday::Sun => self.sunday,
    }
  }

  fn increment(&mut self, day: Weekday) {
    match day {
      Weekday::Mon => self.monday += 1,
      Weekday::Tue => self.tuesday += 1,
      Weekday::Wed => self.wednesday += 1,
      Weekday::Thu => self.thursday += 1,
      Weekday::Fri => self.friday += 1,
      Weekday::Sat => self.saturday += 1,
      Weekday::Sun => self.sunday += 1,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Usage {
  pub total_sessions: u64,
  /// Minutes
  pub total_time_spent: f64,
  pub last_session: Option<DateTime<Utc>>,
  pub time_of_day: TimeOfDay,
  pub days_of_week: DaysOfWeek,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
  Visual,
  Textual,
  Practical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationLength {
  Short,
  Medium,
  Long,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningStyleCounts {
  pub visual: u64,
  pub textual: u64,
  pub practical: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationLengthCounts {
  pub short: u64,
  pub medium: u64,
  pub long: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
  pub learning_style: LearningStyleCounts,
  pub explanation_length: ExplanationLengthCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
  pub topic: String,
  pub rating: u8,
  #[serde(default)]
  pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Feedback {
  /// 1-5
  pub confidence_scores: Vec<u8>,
  pub average_confidence: f64,
  pub user_ratings: Vec<UserRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorAnalysis {
  pub common_errors: BTreeMap<String, u64>,
  pub topic_errors: BTreeMap<String, Tally>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementEntry {
  pub topic: String,
  pub before_score: f64,
  pub after_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Adaptability {
  pub recommendation_success: u64,
  pub total_recommendations: u64,
  pub improvement_rate: Vec<ImprovementEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
  pub device: Option<String>,
  pub browser: Option<String>,
  /// Minutes
  pub average_session_duration: f64,
  pub total_sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementPoint {
  pub date: DateTime<Utc>,
  pub level: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmotionalState {
  /// 0-100
  pub frustration_level: u8,
  /// 0-100
  pub motivation_level: u8,
  pub engagement_trend: Vec<EngagementPoint>,
}

/// Client device reported when a session starts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
  #[serde(default)]
  pub device: Option<String>,
  #[serde(default)]
  pub browser: Option<String>,
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
  pub is_correct: bool,
  #[serde(default)]
  pub topic: String,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
  /// Seconds
  #[serde(default)]
  pub response_time: f64,
  #[serde(default)]
  pub confidence: Option<u8>,
}

/// Display-ready digest of a learner's metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
  pub accuracy: String,
  pub mastered_topics: Vec<String>,
  pub improvement_areas: Vec<String>,
  pub average_response_time: String,
  pub total_sessions: u64,
  pub confidence_level: String,
  pub last_active: Option<DateTime<Utc>>,
  pub preferred_learning_time: DayPart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningMetrics {
  pub user_id: String,
  #[serde(default = "Utc::now")]
  pub last_updated: DateTime<Utc>,
  #[serde(default)]
  pub performance: Performance,
  #[serde(default)]
  pub progress: Progress,
  #[serde(default)]
  pub usage: Usage,
  #[serde(default)]
  pub preferences: Preferences,
  #[serde(default)]
  pub feedback: Feedback,
  #[serde(default)]
  pub error_analysis: ErrorAnalysis,
  #[serde(default)]
  pub adaptability: Adaptability,
  #[serde(default)]
  pub session_data: SessionData,
  #[serde(default)]
  pub emotional_state: EmotionalState,
}

impl LearningMetrics {
  pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      user_id: user_id.into(),
      last_updated: now,
      performance: Performance::default(),
      progress: Progress::default(),
      usage: Usage::default(),
      preferences: Preferences::default(),
      feedback: Feedback::default(),
      error_analysis: ErrorAnalysis::default(),
      adaptability: Adaptability::default(),
      session_data: SessionData::default(),
      emotional_state: EmotionalState::default(),
    }
  }

  /// Rebuild from a stored document. Missing sections fall back to empty
  /// defaults; a missing or empty `userId` is rejected.
  pub fn from_json(value: serde_json::Value) -> Result<Self, MetricsError> {
    let has_user = value
      .get("userId")
      .and_then(|v| v.as_str())
      .is_some_and(|s| !s.trim().is_empty());
    if !has_user {
      return Err(MetricsError::MissingUserId);
    }
    Ok(serde_json::from_value(value)?)
  }

  pub fn to_json(&self) -> serde_json::Value {
    // Only plain data in here; serialization cannot fail
    serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
  }

  /// Percentage of correct answers, 0 when nothing was answered
  pub fn accuracy_percentage(&self) -> f64 {
    if self.performance.total_answers == 0 {
      return 0.0;
    }
    self.performance.correct_answers as f64 / self.performance.total_answers as f64 * 100.0
  }

  pub fn mastered_topics(&self) -> &[String] {
    &self.progress.mastered_topics
  }

  pub fn improvement_areas(&self) -> &[String] {
    &self.progress.improvement_needed
  }

  /// Accumulate response time and recompute the average over answered
  /// questions. The answer count itself is owned by `record_answer`.
  pub fn update_response_time(&mut self, seconds: f64) {
    if !seconds.is_finite() || seconds < 0.0 {
      return;
    }
    let perf = &mut self.performance;
    perf.total_response_time += seconds;
    if perf.total_answers > 0 {
      perf.average_response_time = perf.total_response_time / perf.total_answers as f64;
    }
  }

  pub fn record_answer(&mut self, answer: &AnswerRecord, now: DateTime<Utc>) {
    self.performance.total_answers += 1;
    if answer.is_correct {
      self.performance.correct_answers += 1;
    }

    if let Some(difficulty) = answer.difficulty {
      self
        .performance
        .difficulty_levels
        .get_mut(difficulty)
        .record(answer.is_correct);
    }

    self.update_response_time(answer.response_time);

    if let Some(confidence) = answer.confidence {
      self.record_confidence(confidence);
    }

    let topic = answer.topic.trim();
    if !topic.is_empty() {
      self.update_topic_progress(topic, answer.is_correct);
    }

    self.progress.timeline.push(TimelineEntry {
      date: now,
      topic: topic.to_string(),
      score: u8::from(answer.is_correct),
    });
    keep_latest(&mut self.progress.timeline, config::MAX_HISTORY_ENTRIES);

    self.refresh_emotional_state(now);
    self.last_updated = now;
  }

  /// Update a topic's tally and move it between the mastered and
  /// improvement-needed sets. The two sets never share a topic.
  pub fn update_topic_progress(&mut self, topic: &str, is_correct: bool) {
    let tally = self
      .error_analysis
      .topic_errors
      .entry(topic.to_string())
      .or_default();
    tally.record(is_correct);

    let mastered = tally.accuracy() >= config::MASTERY_THRESHOLD;
    let (target, other) = if mastered {
      (&mut self.progress.mastered_topics, &mut self.progress.improvement_needed)
    } else {
      (&mut self.progress.improvement_needed, &mut self.progress.mastered_topics)
    };

    other.retain(|t| t != topic);
    if !target.iter().any(|t| t == topic) {
      target.push(topic.to_string());
    }
  }

  fn record_confidence(&mut self, confidence: u8) {
    let confidence = confidence.clamp(config::MIN_CONFIDENCE, config::MAX_CONFIDENCE);
    let feedback = &mut self.feedback;
    feedback.confidence_scores.push(confidence);
    let sum: u64 = feedback.confidence_scores.iter().map(|&c| c as u64).sum();
    feedback.average_confidence = sum as f64 / feedback.confidence_scores.len() as f64;
  }

  /// Start a session. `now` must be in the learner's local time zone so the
  /// time-of-day and weekday histograms reflect their day.
  pub fn start_session<Tz: TimeZone>(&mut self, device: Option<&DeviceInfo>, now: DateTime<Tz>) {
    let now_utc = now.with_timezone(&Utc);

    self.usage.total_sessions += 1;
    self.usage.last_session = Some(now_utc);

    if let Some(info) = device {
      self.session_data.device = info.device.clone();
      self.session_data.browser = info.browser.clone();
    }

    self.usage.time_of_day.increment(DayPart::from_hour(now.hour()));
    self.usage.days_of_week.increment(now.weekday());

    self.last_updated = now_utc;
  }

  /// Close a session that lasted `minutes`
  pub fn end_session(&mut self, minutes: f64, now: DateTime<Utc>) {
    if !minutes.is_finite() || minutes < 0.0 {
      return;
    }
    self.usage.total_time_spent += minutes;

    let data = &mut self.session_data;
    data.total_sessions += 1;
    let n = data.total_sessions as f64;
    data.average_session_duration += (minutes - data.average_session_duration) / n;

    self.last_updated = now;
  }

  pub fn record_error(&mut self, error_type: &str, now: DateTime<Utc>) {
    *self
      .error_analysis
      .common_errors
      .entry(error_type.to_string())
      .or_insert(0) += 1;
    self.last_updated = now;
  }

  pub fn record_rating(
    &mut self,
    topic: &str,
    rating: u8,
    comment: Option<String>,
    now: DateTime<Utc>,
  ) {
    self.feedback.user_ratings.push(UserRating {
      topic: topic.to_string(),
      rating: rating.clamp(config::MIN_CONFIDENCE, config::MAX_CONFIDENCE),
      comment,
    });
    self.last_updated = now;
  }

  pub fn record_recommendation(&mut self, successful: bool, now: DateTime<Utc>) {
    self.adaptability.total_recommendations += 1;
    if successful {
      self.adaptability.recommendation_success += 1;
    }
    self.last_updated = now;
  }

  pub fn record_improvement(
    &mut self,
    topic: &str,
    before_score: f64,
    after_score: f64,
    now: DateTime<Utc>,
  ) {
    self.adaptability.improvement_rate.push(ImprovementEntry {
      topic: topic.to_string(),
      before_score,
      after_score,
    });
    self.last_updated = now;
  }

  pub fn record_learning_style(&mut self, style: LearningStyle, now: DateTime<Utc>) {
    let counts = &mut self.preferences.learning_style;
    match style {
      LearningStyle::Visual => counts.visual += 1,
      LearningStyle::Textual => counts.textual += 1,
      LearningStyle::Practical => counts.practical += 1,
    }
    self.last_updated = now;
  }

  pub fn record_explanation_length(&mut self, length: ExplanationLength, now: DateTime<Utc>) {
    let counts = &mut self.preferences.explanation_length;
    match length {
      ExplanationLength::Short => counts.short += 1,
      ExplanationLength::Medium => counts.medium += 1,
      ExplanationLength::Long => counts.long += 1,
    }
    self.last_updated = now;
  }

  /// Recompute the frustration/motivation proxies and append an engagement point.
  ///
  /// Frustration is the share of misses among the most recent answers,
  /// motivation follows average confidence.
  fn refresh_emotional_state(&mut self, now: DateTime<Utc>) {
    let timeline = &self.progress.timeline;
    let window = &timeline[timeline.len().saturating_sub(config::FRUSTRATION_WINDOW)..];

    let frustration = if window.is_empty() {
      0
    } else {
      let misses = window.iter().filter(|e| e.score == 0).count();
      ((misses as f64 / window.len() as f64) * 100.0).round() as u8
    };

    let motivation = ((self.feedback.average_confidence / config::MAX_CONFIDENCE as f64) * 100.0)
      .round()
      .clamp(0.0, 100.0) as u8;

    let state = &mut self.emotional_state;
    state.frustration_level = frustration;
    state.motivation_level = motivation;
    state.engagement_trend.push(EngagementPoint {
      date: now,
      level: 100 - frustration,
    });
    keep_latest(&mut state.engagement_trend, config::MAX_HISTORY_ENTRIES);
  }

  pub fn progress_summary(&self) -> ProgressSummary {
    ProgressSummary {
      accuracy: format!("{:.1}%", self.accuracy_percentage()),
      mastered_topics: self.progress.mastered_topics.clone(),
      improvement_areas: self.progress.improvement_needed.clone(),
      average_response_time: format!("{:.1}s", self.performance.average_response_time),
      total_sessions: self.usage.total_sessions,
      confidence_level: format!("{:.1}/5", self.feedback.average_confidence),
      last_active: self.usage.last_session,
      preferred_learning_time: self.usage.time_of_day.preferred(),
    }
  }
}

/// Drop the oldest entries beyond `max`
fn keep_latest<T>(entries: &mut Vec<T>, max: usize) {
  if entries.len() > max {
    entries.drain(..entries.len() - max);
  }
}
