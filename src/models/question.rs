// src/models/question.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{Difficulty, QuizRef},
    services::scoring::{AnswerSymbol, letter_slot},
    utils::html::clean_html,
};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// 1-based rank inside the quiz. Unique per quiz.
    pub position: i32,

    pub title: String,
    pub text: String,

    /// URL (or data URL) of an illustration.
    pub image: Option<String>,

    pub difficulty: Difficulty,

    /// Stored as a JSON array in the database.
    pub tags: Json<Vec<String>>,

    /// Explanation of the correct answer. Only shown on single-question reads.
    pub explanation: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'choices' table in the database.
/// Attachment order is id order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Choice as sent to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChoiceResponse {
    pub id: i64,
    pub text: String,
    /// Always `false` on masked views.
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
}

/// Question as sent to clients, with its choices.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: i64,
    pub quiz_id: i64,
    pub position: i32,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    #[serde(rename = "possibleAnswers")]
    pub possible_answers: Vec<ChoiceResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionResponse {
    /// Builds the client view. `reveal` exposes correctness and explanation.
    pub fn from_parts(question: Question, choices: Vec<Choice>, reveal: bool) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            position: question.position,
            title: question.title,
            text: question.text,
            image: question.image,
            difficulty: question.difficulty,
            tags: question.tags.0,
            possible_answers: choices
                .into_iter()
                .map(|c| ChoiceResponse {
                    id: c.id,
                    text: c.text,
                    is_correct: reveal && c.is_correct,
                })
                .collect(),
            explanation: if reveal { question.explanation } else { None },
        }
    }
}

/// Query parameters for `GET /api/questions`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct QuestionListParams {
    pub quiz_id: Option<i64>,
    pub position: Option<i32>,
}

/// Query parameters for the bulk import.
#[derive(Debug, Deserialize, IntoParams)]
pub struct BulkImportParams {
    /// Overrides every item's quiz. An id or an alias such as `roland`.
    pub quiz_id: Option<String>,
}

impl BulkImportParams {
    pub fn forced_quiz(&self) -> Result<Option<i64>, AppError> {
        self.quiz_id
            .as_ref()
            .map(|raw| QuizRef::Name(raw.clone()).resolve())
            .transpose()
    }
}

/// A choice in the detailed `{text, is_correct}` encoding.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChoiceInput {
    pub text: String,
    #[serde(default, alias = "isCorrect")]
    pub is_correct: bool,
}

/// The choice list encodings accepted on question payloads.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ChoicesInput {
    /// `[{text, is_correct}]`
    Detailed(Vec<ChoiceInput>),
    /// `["text", ...]` with `correct_index`
    Plain(Vec<String>),
    /// `{"A": "text", "B": "text"}` with `correct`
    Lettered(BTreeMap<String, String>),
}

/// Question payload for create and bulk import.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct QuestionPayload {
    /// Quiz id or alias.
    #[serde(default, alias = "quizId")]
    pub quiz_id: Option<QuizRef>,

    /// Absent or 0 appends; larger values are clamped to the end.
    #[validate(range(min = 0, message = "Position must not be negative"))]
    #[serde(default)]
    pub position: Option<i32>,

    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    #[serde(default)]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    #[serde(default, alias = "question")]
    pub text: Option<String>,

    #[validate(length(max = 500_000), custom(function = validate_image))]
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub difficulty: Option<Difficulty>,

    #[validate(length(max = 20), custom(function = validate_tags))]
    #[serde(default)]
    pub tags: Vec<String>,

    #[validate(length(max = 5000))]
    #[serde(default)]
    pub explanation: Option<String>,

    #[serde(default, alias = "possibleAnswers")]
    pub choices: Option<ChoicesInput>,

    /// Correct letter (or 1-based index) for the lettered and plain encodings.
    #[serde(default, alias = "answer")]
    pub correct: Option<AnswerSymbol>,

    /// Zero-based correct slot for the plain encoding.
    #[serde(default, alias = "correctIndex", alias = "answerIndex")]
    pub correct_index: Option<i64>,
}

/// DTO for updating a question. Fields are optional; `choices` replaces the set.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub text: Option<String>,
    #[validate(length(max = 500_000), custom(function = validate_image))]
    pub image: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[validate(length(max = 20), custom(function = validate_tags))]
    pub tags: Option<Vec<String>>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[serde(default, alias = "possibleAnswers")]
    pub choices: Option<Vec<ChoiceInput>>,
    /// Target position; clamped to the quiz size.
    #[validate(range(min = 0, message = "Position must not be negative"))]
    pub position: Option<i32>,
}

/// A validated, sanitised question ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub explanation: Option<String>,
    pub choices: Vec<ChoiceDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceDraft {
    pub text: String,
    pub is_correct: bool,
}

impl QuestionPayload {
    /// The quiz named by `quiz_id`, aliases resolved.
    pub fn target_quiz(&self) -> Result<Option<i64>, AppError> {
        self.quiz_id.as_ref().map(QuizRef::resolve).transpose()
    }

    /// Quiz for a bulk item without an explicit quiz: chosen by difficulty.
    pub fn fallback_quiz(&self) -> i64 {
        self.difficulty.unwrap_or_default().default_quiz_id()
    }

    /// Validates the payload and normalises every choice encoding to a draft.
    pub fn into_draft(self) -> Result<QuestionDraft, AppError> {
        self.validate()?;

        let title = non_blank(self.title);
        let text = non_blank(self.text);
        let (title, text) = match (title, text) {
            (Some(title), Some(text)) => (title, text),
            (Some(title), None) => (title.clone(), title),
            // A title borrowed from the text is cut to the column width.
            (None, Some(text)) => (text.chars().take(200).collect(), text),
            (None, None) => {
                return Err(AppError::BadRequest("Missing field: title or text".to_string()));
            }
        };

        let correct_slot = match (self.correct_index, &self.correct) {
            (Some(idx), _) => Some(usize::try_from(idx).map_err(|_| {
                AppError::BadRequest("correct_index must not be negative".to_string())
            })?),
            (None, Some(symbol)) => Some(symbol.choice_index().ok_or_else(|| {
                AppError::BadRequest("correct answer is not a letter or index".to_string())
            })?),
            (None, None) => None,
        };

        let choices = match self.choices {
            None => Vec::new(),
            Some(ChoicesInput::Detailed(list)) => list
                .into_iter()
                .map(|c| ChoiceDraft {
                    text: clean_html(&c.text),
                    is_correct: c.is_correct,
                })
                .collect(),
            Some(ChoicesInput::Plain(list)) => list
                .into_iter()
                .enumerate()
                .map(|(idx, text)| ChoiceDraft {
                    text: clean_html(&text),
                    is_correct: correct_slot == Some(idx),
                })
                .collect(),
            Some(ChoicesInput::Lettered(map)) => {
                let mut slots: Vec<(usize, String)> = Vec::with_capacity(map.len());
                for (letter, text) in map {
                    let mut chars = letter.trim().chars();
                    let slot = match (chars.next(), chars.next()) {
                        (Some(c), None) => letter_slot(c),
                        _ => None,
                    }
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid choice key: {letter}")))?;
                    if slots.iter().any(|(taken, _)| *taken == slot) {
                        return Err(AppError::BadRequest(format!(
                            "Duplicate choice key: {letter}"
                        )));
                    }
                    slots.push((slot, text));
                }
                slots.sort_by_key(|(slot, _)| *slot);
                slots
                    .into_iter()
                    .map(|(slot, text)| ChoiceDraft {
                        text: clean_html(&text),
                        is_correct: correct_slot == Some(slot),
                    })
                    .collect()
            }
        };

        Ok(QuestionDraft {
            title: clean_html(&title),
            text: clean_html(&text),
            image: non_blank(self.image),
            difficulty: self.difficulty.unwrap_or_default(),
            tags: clean_tags(self.tags),
            explanation: non_blank(self.explanation).map(|e| clean_html(&e)),
            choices,
        })
    }
}

impl ChoiceInput {
    pub fn into_draft(self) -> ChoiceDraft {
        ChoiceDraft {
            text: clean_html(&self.text),
            is_correct: self.is_correct,
        }
    }
}

/// Trims tags, drops empty ones and sanitises the rest.
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|t| clean_html(&t))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Images are referenced by URL; data URLs are accepted.
fn validate_image(image: &str) -> Result<(), validator::ValidationError> {
    if image.trim().is_empty() {
        return Ok(());
    }
    if Url::parse(image).is_err() {
        return Err(validator::ValidationError::new("invalid_image_url"));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    for tag in tags {
        if tag.len() > 50 {
            return Err(validator::ValidationError::new("tag_too_long"));
        }
    }
    Ok(())
}
