//! Tutor operations: one prompt, one completion, one typed result.

use serde::{Deserialize, Serialize};

use super::{prompts, CompletionProvider, LlmError};
use crate::config;
use crate::domain::course::{ChapterContent, ChapterOutline, ContentItem, Course, CourseInput, CourseLayout};
use crate::domain::{Flashcard, LearningMetrics};
use crate::normalizer::classify::{attribute_topic, classify_difficulty, estimate_difficulty};
use crate::normalizer::{compare_answers, format_response, parse_lenient, ExamQuestion, StructuredResponse};

/// Upper bound on cards requested per note
const MAX_CARDS_PER_NOTE: usize = 10;

/// Layouts come back either wrapped in `{"course": ...}` or bare
#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutEnvelope {
    Wrapped { course: CourseLayout },
    Bare(CourseLayout),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChapterEnvelope {
    Items(Vec<ContentItem>),
    Wrapped {
        #[serde(alias = "content", alias = "topics", alias = "sections")]
        items: Vec<ContentItem>,
    },
}

pub async fn generate_course_layout(
    provider: &dyn CompletionProvider,
    input: &CourseInput,
) -> Result<CourseLayout, LlmError> {
    let text = provider.complete(&prompts::course_layout(input)).await?;
    let mut layout = match parse_lenient::<LayoutEnvelope>(&text)? {
        LayoutEnvelope::Wrapped { course } => course,
        LayoutEnvelope::Bare(layout) => layout,
    };

    // Fill what the model left out from the request
    if layout.category.is_none() && !input.category.is_empty() {
        layout.category = Some(input.category.clone());
    }
    if layout.level.is_none() && !input.level.is_empty() {
        layout.level = Some(input.level.clone());
    }
    if layout.duration.is_none() && !input.duration.is_empty() {
        layout.duration = Some(input.duration.clone());
    }

    tracing::info!(
        "Generated layout '{}' with {} chapters",
        layout.name,
        layout.chapters.len()
    );
    Ok(layout)
}

pub async fn generate_chapter_content(
    provider: &dyn CompletionProvider,
    course_name: &str,
    index: usize,
    chapter: &ChapterOutline,
) -> Result<ChapterContent, LlmError> {
    let text = provider
        .complete(&prompts::chapter_content(course_name, chapter))
        .await?;
    let items = match parse_lenient::<ChapterEnvelope>(&text)? {
        ChapterEnvelope::Items(items) => items,
        ChapterEnvelope::Wrapped { items } => items,
    };

    Ok(ChapterContent {
        index,
        name: chapter.name.clone(),
        items,
    })
}

pub async fn generate_course_response(
    provider: &dyn CompletionProvider,
    question: &str,
    course: Option<&Course>,
    metrics: Option<&LearningMetrics>,
    user_name: Option<&str>,
) -> Result<StructuredResponse, LlmError> {
    let prompt = prompts::course_response(question, course, metrics, user_name);
    let text = provider.complete(&prompt).await?;
    Ok(format_response(&text))
}

/// Grade of a learner's answer to an exam question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub is_correct: bool,
    /// 0-100
    pub accuracy: f64,
    pub feedback: String,
    pub correct_answer: String,
    /// Graded locally because the model was unavailable or unreadable
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    #[serde(default)]
    is_correct: Option<bool>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    correct_answer: Option<String>,
}

/// Grade an answer with the model, falling back to local comparison.
/// Never fails: a learner's answer always gets a verdict.
pub async fn evaluate_answer(
    provider: &dyn CompletionProvider,
    exam: &ExamQuestion,
    answer: &str,
    user_name: Option<&str>,
) -> Evaluation {
    let prompt = prompts::evaluate_answer(exam, answer, user_name);
    let raw = match provider.complete(&prompt).await {
        Ok(text) => parse_lenient::<RawEvaluation>(&text).map_err(LlmError::from),
        Err(e) => Err(e),
    };

    match raw {
        Ok(raw) if raw.is_correct.is_some() || raw.accuracy.is_some() => {
            let accuracy = raw
                .accuracy
                .map(|a| a.clamp(0.0, 100.0))
                .unwrap_or(if raw.is_correct == Some(true) { 100.0 } else { 0.0 });
            Evaluation {
                is_correct: raw
                    .is_correct
                    .unwrap_or(accuracy >= config::EVALUATION_PASS_ACCURACY),
                accuracy,
                feedback: raw.feedback.unwrap_or_default(),
                correct_answer: raw
                    .correct_answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| exam.correct_answer.clone()),
                fallback: false,
            }
        }
        Ok(_) => {
            tracing::warn!("Evaluation had no verdict, grading locally");
            local_evaluation(exam, answer)
        }
        Err(e) => {
            tracing::warn!("Evaluation via {} failed ({}), grading locally", provider.name(), e);
            local_evaluation(exam, answer)
        }
    }
}

fn local_evaluation(exam: &ExamQuestion, answer: &str) -> Evaluation {
    let result = compare_answers(answer, &exam.correct_answer);
    let feedback = if result.is_correct() {
        "Correct, well done!".to_string()
    } else {
        format!("Not quite. The expected answer was: {}", exam.correct_answer)
    };
    Evaluation {
        is_correct: result.is_correct(),
        accuracy: result.accuracy(),
        feedback,
        correct_answer: exam.correct_answer.clone(),
        fallback: true,
    }
}

pub async fn improve_note(
    provider: &dyn CompletionProvider,
    content: &str,
    subject: &str,
) -> Result<String, LlmError> {
    let text = provider.complete(&prompts::improve_note(content, subject)).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Note a learner picked for flashcard generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteSource {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CardsEnvelope {
    Cards(Vec<RawCard>),
    Wrapped {
        #[serde(alias = "flashcards")]
        cards: Vec<RawCard>,
    },
}

#[derive(Deserialize)]
struct RawCard {
    #[serde(alias = "question")]
    front: String,
    #[serde(alias = "answer")]
    back: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    topic: Option<String>,
}

/// Generate cards for one note. Ids are `{note_id}-{n}`; missing difficulty
/// and topic are filled in heuristically.
pub async fn generate_flashcards(
    provider: &dyn CompletionProvider,
    note: &NoteSource,
    known_topics: &[String],
) -> Result<Vec<Flashcard>, LlmError> {
    let prompt = prompts::flashcards(&note.content, &note.subject, MAX_CARDS_PER_NOTE);
    let text = provider.complete(&prompt).await?;
    let raw = match parse_lenient::<CardsEnvelope>(&text)? {
        CardsEnvelope::Cards(cards) => cards,
        CardsEnvelope::Wrapped { cards } => cards,
    };

    let cards: Vec<Flashcard> = raw
        .into_iter()
        .filter(|c| !c.front.trim().is_empty() && !c.back.trim().is_empty())
        .enumerate()
        .map(|(i, c)| {
            let mut card = Flashcard::new(
                format!("{}-{}", note.id, i),
                c.front.trim().to_string(),
                c.back.trim().to_string(),
            );
            card.note_id = Some(note.id.clone());
            card.subject = (!note.subject.is_empty()).then(|| note.subject.clone());
            card.difficulty = c
                .difficulty
                .as_deref()
                .and_then(classify_difficulty)
                .or_else(|| Some(estimate_difficulty(&card.front, &card.back)));
            card.topic = c
                .topic
                .filter(|t| !t.trim().is_empty())
                .or_else(|| {
                    let text = format!("{} {}", card.front, card.back);
                    attribute_topic(&text, known_topics).map(str::to_string)
                });
            card
        })
        .collect();

    tracing::debug!("Generated {} flashcards from note {}", cards.len(), note.id);
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with canned completions in order
    struct Scripted(Mutex<Vec<Result<String, LlmError>>>);

    impl Scripted {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self(Mutex::new(replies))
        }

        fn text(reply: &str) -> Self {
            Self::new(vec![Ok(reply.to_string())])
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            let mut replies = self.0.lock().unwrap();
            if replies.is_empty() {
                Err(LlmError::EmptyResponse)
            } else {
                replies.remove(0)
            }
        }
    }

    fn exam() -> ExamQuestion {
        ExamQuestion {
            question: "What keyword declares a mutable binding?".into(),
            correct_answer: "let mut".into(),
            topic: "variables".into(),
            difficulty: None,
        }
    }

    fn input() -> CourseInput {
        CourseInput {
            category: "Programming".into(),
            topic: "Rust".into(),
            description: None,
            level: "Beginner".into(),
            duration: "1 Hour".into(),
            chapter_count: 2,
            include_video: false,
        }
    }

    #[tokio::test]
    async fn test_layout_wrapped_and_filled() {
        let provider = Scripted::text(
            r#"```json
{"course": {"name": "Rust", "description": "Basics", "chapters": [{"name": "Ownership", "about": "Moves"}, {"name": "Traits"}]}}
```"#,
        );
        let layout = generate_course_layout(&provider, &input()).await.unwrap();
        assert_eq!(layout.name, "Rust");
        assert_eq!(layout.chapters.len(), 2);
        assert_eq!(layout.duration.as_deref(), Some("1 Hour"));
        assert_eq!(layout.category.as_deref(), Some("Programming"));
    }

    #[tokio::test]
    async fn test_layout_bare() {
        let provider = Scripted::text(r#"{"name": "Rust", "duration": "2 Hours", "chapters": []}"#);
        let layout = generate_course_layout(&provider, &input()).await.unwrap();
        assert_eq!(layout.duration.as_deref(), Some("2 Hours"));
    }

    #[tokio::test]
    async fn test_layout_unreadable() {
        let provider = Scripted::text("I cannot help with that.");
        assert!(matches!(
            generate_course_layout(&provider, &input()).await,
            Err(LlmError::Normalize(_))
        ));
    }

    #[tokio::test]
    async fn test_chapter_content_shapes() {
        let outline = ChapterOutline {
            name: "Ownership".into(),
            about: String::new(),
            duration: None,
        };

        let provider = Scripted::text(r#"[{"title": "Moves", "description": "Values move", "code": "<precode>let b = a;</precode>"}]"#);
        let content = generate_chapter_content(&provider, "Rust", 0, &outline).await.unwrap();
        assert_eq!(content.items.len(), 1);
        assert_eq!(content.items[0].code_example.as_deref(), Some("<precode>let b = a;</precode>"));

        let provider = Scripted::text(r#"{"content": [{"title": "Borrows", "description": "Refs"}]}"#);
        let content = generate_chapter_content(&provider, "Rust", 1, &outline).await.unwrap();
        assert_eq!(content.index, 1);
        assert_eq!(content.items[0].title, "Borrows");
    }

    #[tokio::test]
    async fn test_course_response_falls_back_to_text() {
        let provider = Scripted::text("Just read chapter two.");
        let response = generate_course_response(&provider, "help", None, None, None)
            .await
            .unwrap();
        assert_eq!(response.explanation, "Just read chapter two.");
    }

    #[tokio::test]
    async fn test_evaluate_with_model() {
        let provider = Scripted::text(r#"{"isCorrect": true, "accuracy": 95, "feedback": "Great"}"#);
        let eval = evaluate_answer(&provider, &exam(), "let mut", Some("Ana")).await;
        assert!(eval.is_correct);
        assert_eq!(eval.accuracy, 95.0);
        assert_eq!(eval.correct_answer, "let mut");
        assert!(!eval.fallback);
    }

    #[tokio::test]
    async fn test_evaluate_derives_verdict_from_accuracy() {
        let provider = Scripted::text(r#"{"accuracy": 60}"#);
        let eval = evaluate_answer(&provider, &exam(), "mut", None).await;
        assert!(!eval.is_correct);

        let provider = Scripted::text(r#"{"accuracy": 140}"#);
        let eval = evaluate_answer(&provider, &exam(), "let mut", None).await;
        assert!(eval.is_correct);
        assert_eq!(eval.accuracy, 100.0);
    }

    #[tokio::test]
    async fn test_evaluate_falls_back_locally() {
        let provider = Scripted::new(vec![Err(LlmError::NotConfigured)]);
        let eval = evaluate_answer(&provider, &exam(), "Let Mut", None).await;
        assert!(eval.is_correct);
        assert!(eval.fallback);

        let provider = Scripted::text("no idea");
        let eval = evaluate_answer(&provider, &exam(), "const", None).await;
        assert!(!eval.is_correct);
        assert_eq!(eval.accuracy, 0.0);
        assert!(eval.fallback);
    }

    #[tokio::test]
    async fn test_improve_note() {
        let provider = Scripted::text("  Better note  ");
        assert_eq!(improve_note(&provider, "note", "Rust").await.unwrap(), "Better note");

        let provider = Scripted::text("   ");
        assert!(matches!(
            improve_note(&provider, "note", "Rust").await,
            Err(LlmError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_generate_flashcards_fills_gaps() {
        let provider = Scripted::text(
            r#"[
              {"front": "What is a trait?", "back": "Shared behaviour", "difficulty": "Fácil", "topic": "Traits"},
              {"front": "What does the borrow checker enforce?", "back": "Reference rules"},
              {"front": "", "back": "dropped"}
            ]"#,
        );
        let note = NoteSource {
            id: "n1".into(),
            subject: "Rust".into(),
            content: "notes".into(),
        };
        let topics = vec!["Borrow checker".to_string()];

        let cards = generate_flashcards(&provider, &note, &topics).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, "n1-0");
        assert_eq!(cards[0].difficulty, Some(Difficulty::Easy));
        assert_eq!(cards[0].topic.as_deref(), Some("Traits"));
        assert_eq!(cards[1].id, "n1-1");
        assert_eq!(cards[1].difficulty, Some(Difficulty::Easy));
        assert_eq!(cards[1].topic.as_deref(), Some("Borrow checker"));
        assert_eq!(cards[1].subject.as_deref(), Some("Rust"));
        assert_eq!(cards[1].note_id.as_deref(), Some("n1"));
    }
}
