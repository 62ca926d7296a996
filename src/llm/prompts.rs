//! Prompt templates.
//!
//! Every prompt that expects structured output spells out the JSON shape the
//! tutor parses; the normalizer copes with the usual deviations.

use crate::domain::course::{ChapterOutline, Course, CourseInput};
use crate::domain::LearningMetrics;
use crate::normalizer::ExamQuestion;

pub fn course_layout(input: &CourseInput) -> String {
    let description = input
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!(", Description: {}", d))
        .unwrap_or_default();

    format!(
        "Generate a course tutorial with the following details: course name, description, \
         chapter names, what each chapter is about, and duration. \
         Category: {}, Topic: {}{}, Level: {}, Duration: {}, NoOfChapters: {}. \
         Respond with JSON only, shaped as {{\"course\": {{\"name\": \"...\", \"description\": \"...\", \
         \"duration\": \"...\", \"chapters\": [{{\"name\": \"...\", \"about\": \"...\", \"duration\": \"...\"}}]}}}}. \
         Write the content in the language of the topic.",
        input.category, input.topic, description, input.level, input.duration, input.chapter_count
    )
}

pub fn chapter_content(course_name: &str, chapter: &ChapterOutline) -> String {
    format!(
        "Explain the concept in detail on the topic: {}, chapter: {}. \
         Respond with JSON only: an array of objects with the fields \"title\", \
         \"description\" (detailed) and \"codeExample\" (code in a <precode> block, only if applicable).",
        course_name, chapter.name
    )
}

fn course_context(course: &Course) -> String {
    let mut context = format!(
        "Course: {}\nDescription: {}\n",
        course.layout.name, course.layout.description
    );
    if !course.chapters.is_empty() {
        context.push_str("Chapters:\n");
        for chapter in &course.chapters {
            let items = chapter
                .items
                .iter()
                .map(|item| format!("{} - {}", item.title, item.description))
                .collect::<Vec<_>>()
                .join("; ");
            context.push_str(&format!("{}: {}\n", chapter.name, items));
        }
    } else if !course.layout.chapters.is_empty() {
        let names = course
            .layout
            .chapters
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        context.push_str(&format!("Chapters: {}\n", names));
    }
    context
}

fn learner_progress(metrics: &LearningMetrics) -> String {
    let or_none = |items: &[String], none: &str| {
        if items.is_empty() {
            none.to_string()
        } else {
            items.join(", ")
        }
    };
    format!(
        "Learner progress:\n- Mastered topics: {}\n- Areas to improve: {}\n- Current accuracy: {:.1}%\n",
        or_none(metrics.mastered_topics(), "none yet"),
        or_none(metrics.improvement_areas(), "not identified yet"),
        metrics.accuracy_percentage()
    )
}

pub fn course_response(
    question: &str,
    course: Option<&Course>,
    metrics: Option<&LearningMetrics>,
    user_name: Option<&str>,
) -> String {
    let course_info = course.map(course_context).unwrap_or_default();
    let progress = metrics.map(learner_progress).unwrap_or_default();
    let greeting = user_name
        .map(|name| format!("The learner's name is {}. ", name))
        .unwrap_or_default();

    format!(
        "You are an expert educational assistant for an online course. Your goal is to help the \
         learner understand and master the course content. {greeting}\n\n\
         Course information:\n{course_info}\n{progress}\n\
         Learner question: {question}\n\n\
         Reply with JSON including only the relevant fields:\n\
         {{\"title\": \"...\", \"explanation\": \"...\", \
         \"steps\": [{{\"title\": \"...\", \"description\": \"...\"}}], \
         \"example\": \"...\", \"info\": \"...\", \"warning\": \"...\", \
         \"code\": \"...\", \"language\": \"...\"}}\n\
         If the learner asks to be tested, add \"type\": \"exam_request\" and an \
         \"exam\": {{\"question\": \"...\", \"correctAnswer\": \"...\", \"topic\": \"...\", \
         \"difficulty\": \"easy|medium|hard\"}} object, and do not reveal the answer.\n\
         Base the answer on the course content, keep a friendly and motivating tone, and \
         steer unrelated questions back to the course material."
    )
}

pub fn evaluate_answer(exam: &ExamQuestion, answer: &str, user_name: Option<&str>) -> String {
    let name = user_name.unwrap_or("the learner");
    format!(
        "Evaluate {name}'s answer to a course question.\n\
         Question: {}\nExpected answer: {}\nLearner answer: {answer}\n\n\
         Respond with JSON only: {{\"isCorrect\": true|false, \"accuracy\": 0-100, \
         \"feedback\": \"short encouraging feedback addressed to {name}\", \
         \"correctAnswer\": \"...\"}}",
        exam.question, exam.correct_answer
    )
}

pub fn improve_note(content: &str, subject: &str) -> String {
    format!(
        "As an expert educator in \"{subject}\", improve and enrich the following study note. \
         Add relevant detail and practical examples, make sure the information is accurate and \
         well structured, and keep an academic but approachable tone.\n\n\
         Original note:\n{content}\n\n\
         Structure the improved note as:\n\
         1. Main content (improved and expanded)\n\
         2. Practical examples\n\
         3. Key points to remember\n\
         4. Further references or resources (if applicable)"
    )
}

pub fn flashcards(note: &str, subject: &str, max_cards: usize) -> String {
    format!(
        "Create up to {max_cards} study flashcards for the subject \"{subject}\" from this note:\n\
         {note}\n\n\
         Respond with JSON only: an array of {{\"front\": \"question\", \"back\": \"answer\", \
         \"difficulty\": \"easy|medium|hard\", \"topic\": \"short topic name\"}}. \
         Write the cards in the language of the note."
    )
}
