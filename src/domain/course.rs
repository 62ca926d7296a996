//! Generated courses.
//!
//! A course layout comes from one completion and is stored as-is. Chapter
//! content is backfilled afterwards, one chapter at a time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

#[derive(Debug, Error, PartialEq)]
pub enum CourseError {
  #[error("course topic is required")]
  EmptyTopic,
  #[error("chapter count must be between 1 and {max}, got {got}")]
  ChapterCount { got: u32, max: u32 },
  #[error("chapter {0} does not exist in the course layout")]
  ChapterOutOfRange(usize),
  #[error("chapter name cannot be empty")]
  EmptyChapterName,
}

/// Learner's request for a new course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
  #[serde(default)]
  pub category: String,
  pub topic: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub level: String,
  #[serde(default)]
  pub duration: String,
  #[serde(alias = "noOfChapter")]
  pub chapter_count: u32,
  #[serde(default)]
  pub include_video: bool,
}

impl CourseInput {
  pub fn validate(&self) -> Result<(), CourseError> {
    if self.topic.trim().is_empty() {
      return Err(CourseError::EmptyTopic);
    }
    if self.chapter_count == 0 || self.chapter_count > config::MAX_CHAPTERS {
      return Err(CourseError::ChapterCount {
        got: self.chapter_count,
        max: config::MAX_CHAPTERS,
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterOutline {
  #[serde(alias = "chapterName", alias = "chapter_name")]
  pub name: String,
  #[serde(default, alias = "About", alias = "description")]
  pub about: String,
  #[serde(default, alias = "Duration")]
  pub duration: Option<String>,
}

/// Course outline as returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseLayout {
  #[serde(alias = "courseName", alias = "course_name")]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub level: Option<String>,
  #[serde(default)]
  pub duration: Option<String>,
  #[serde(default)]
  pub chapters: Vec<ChapterOutline>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
  #[serde(default, alias = "titulo", alias = "título")]
  pub title: String,
  #[serde(default, alias = "descripcion", alias = "descripción")]
  pub description: String,
  #[serde(default, alias = "code", alias = "code_example")]
  pub code_example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
  pub index: usize,
  pub name: String,
  pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseStatus {
  #[default]
  Draft,
  Completed,
}

impl CourseStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Draft => "DRAFT",
      Self::Completed => "COMPLETED",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  pub course_id: String,
  pub name: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub level: String,
  #[serde(default)]
  pub include_video: bool,
  pub created_by: String,
  #[serde(default)]
  pub status: CourseStatus,
  pub layout: CourseLayout,
  /// Kept sorted by chapter index
  #[serde(default)]
  pub chapters: Vec<ChapterContent>,
}

impl Course {
  pub fn new(course_id: String, created_by: String, input: &CourseInput, layout: CourseLayout) -> Self {
    let or_default = |value: &str, fallback: &str| {
      if value.trim().is_empty() {
        fallback.to_string()
      } else {
        value.to_string()
      }
    };

    Self {
      course_id,
      name: or_default(&input.topic, "Untitled"),
      category: or_default(&input.category, "General"),
      level: or_default(&input.level, "Beginner"),
      include_video: input.include_video,
      created_by,
      status: CourseStatus::Draft,
      layout,
      chapters: Vec::new(),
    }
  }

  pub fn chapter_count(&self) -> usize {
    self.layout.chapters.len()
  }

  /// Store content for one chapter, replacing earlier content for the same
  /// index. The course completes once every outlined chapter has content.
  pub fn set_chapter_content(&mut self, content: ChapterContent) -> Result<(), CourseError> {
    if content.index >= self.chapter_count() {
      return Err(CourseError::ChapterOutOfRange(content.index));
    }

    match self.chapters.binary_search_by_key(&content.index, |c| c.index) {
      Ok(pos) => self.chapters[pos] = content,
      Err(pos) => self.chapters.insert(pos, content),
    }

    if self.chapters.len() == self.chapter_count() {
      self.status = CourseStatus::Completed;
    }
    Ok(())
  }

  pub fn rename_chapter(&mut self, index: usize, name: &str) -> Result<(), CourseError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(CourseError::EmptyChapterName);
    }
    let outline = self
      .layout
      .chapters
      .get_mut(index)
      .ok_or(CourseError::ChapterOutOfRange(index))?;
    outline.name = name.to_string();
    if let Some(content) = self.chapters.iter_mut().find(|c| c.index == index) {
      content.name = name.to_string();
    }
    Ok(())
  }

  pub fn minutes_per_chapter(&self) -> i64 {
    minutes_per_chapter(self.layout.duration.as_deref().unwrap_or(""), self.chapter_count())
  }
}

/// Study minutes allotted to each chapter for a course duration label
pub fn minutes_per_chapter(duration: &str, chapter_count: usize) -> i64 {
  let total = match duration {
    "1 Hour" => 60.0,
    "2 Hours" => 120.0,
    "More than 3 Hours" => 180.0,
    _ => 60.0,
  };
  (total / chapter_count.max(1) as f64).round() as i64
}

/// Generate a random course id
pub fn generate_course_id() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..config::COURSE_ID_LEN)
    .map(|_| {
      let idx = rng.random_range(0..36u8);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}
