pub mod course;
pub mod flashcard;
pub mod metrics;
pub mod progress;
pub mod review;

pub use course::{
  ChapterContent, ChapterOutline, ContentItem, Course, CourseError, CourseInput, CourseLayout, CourseStatus,
};
pub use flashcard::{CardStatus, Flashcard};
pub use metrics::{AnswerRecord, DeviceInfo, LearningMetrics, MetricsError, ProgressSummary};
pub use progress::{ProgressRecord, QuizResult, QuizStats};
pub use review::{Difficulty, ReviewRating};
