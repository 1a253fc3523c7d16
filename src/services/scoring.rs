// src/services/scoring.rs

//! Scoring engine.
//!
//! Every accepted submission encoding is resolved to canonical
//! `(question_id, choice_id)` pairs against an [`AnswerKey`] snapshot of the
//! quiz, then scored from the stored `is_correct` flags.

use std::collections::HashSet;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;

/// A choice as seen by the scorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChoice {
    pub id: i64,
    pub is_correct: bool,
}

/// A question with its choices in attachment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQuestion {
    pub id: i64,
    pub position: i32,
    pub choices: Vec<KeyChoice>,
}

/// Snapshot of a quiz's questions, ordered by position.
#[derive(Debug, Clone, Default)]
pub struct AnswerKey {
    questions: Vec<KeyQuestion>,
}

impl AnswerKey {
    pub fn new(mut questions: Vec<KeyQuestion>) -> Self {
        questions.sort_by_key(|q| q.position);
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, question_id: i64) -> Option<&KeyQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn questions(&self) -> &[KeyQuestion] {
        &self.questions
    }
}

/// A symbolic reference to one of a question's choices.
///
/// Letters `A` to `D` map to attachment order (`A` is the first choice).
/// Integers `>= 1` are 1-based, `0` is the first choice. Numeric strings
/// behave like integers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerSymbol {
    Index(i64),
    Label(String),
}

impl AnswerSymbol {
    /// Zero-based choice slot this symbol designates, if any.
    pub fn choice_index(&self) -> Option<usize> {
        match self {
            AnswerSymbol::Index(n) => index_from_number(*n),
            AnswerSymbol::Label(label) => {
                let label = label.trim();
                if let Ok(n) = label.parse::<i64>() {
                    return index_from_number(n);
                }
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => letter_slot(c),
                    _ => None,
                }
            }
        }
    }
}

/// `A`..=`D`, case-insensitive.
pub fn letter_slot(c: char) -> Option<usize> {
    match c.to_ascii_uppercase() {
        c @ 'A'..='D' => Some((c as u8 - b'A') as usize),
        _ => None,
    }
}

fn index_from_number(n: i64) -> Option<usize> {
    match n {
        n if n >= 1 => usize::try_from(n - 1).ok(),
        0 => Some(0),
        _ => None,
    }
}

/// One explicit answer object.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnswerEntry {
    #[serde(alias = "questionId")]
    pub question_id: i64,
    #[serde(default, alias = "choiceId")]
    pub choice_id: Option<i64>,
    #[serde(default)]
    pub answer: Option<AnswerSymbol>,
}

/// The accepted submission encodings.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Submission {
    /// `[{question_id, choice_id}]` or `[{question_id, answer}]`.
    Explicit(Vec<AnswerEntry>),
    /// One letter or index per question, in position order.
    Positional(Vec<AnswerSymbol>),
}

/// A canonical answer ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAnswer {
    pub question_id: i64,
    pub choice_id: i64,
    pub is_correct: bool,
}

/// Resolves a submission to canonical answers.
///
/// Answers that point at unknown questions or at choices of another question
/// are skipped. Only the first answer per question is kept. A positional list
/// must have exactly one entry per question.
pub fn resolve(submission: &Submission, key: &AnswerKey) -> Result<Vec<ResolvedAnswer>, AppError> {
    let candidates: Vec<(i64, Option<i64>)> = match submission {
        Submission::Explicit(entries) => entries
            .iter()
            .map(|entry| {
                let choice_id = match (entry.choice_id, &entry.answer) {
                    (Some(choice_id), _) => Some(choice_id),
                    (None, Some(symbol)) => key
                        .question(entry.question_id)
                        .and_then(|q| choice_at(q, symbol)),
                    (None, None) => None,
                };
                (entry.question_id, choice_id)
            })
            .collect(),
        Submission::Positional(symbols) => {
            if symbols.len() != key.len() {
                return Err(AppError::UnprocessableEntity(format!(
                    "Expected {} answers, got {}",
                    key.len(),
                    symbols.len()
                )));
            }
            key.questions()
                .iter()
                .zip(symbols)
                .map(|(question, symbol)| (question.id, choice_at(question, symbol)))
                .collect()
        }
    };

    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(candidates.len());

    for (question_id, choice_id) in candidates {
        let Some(question) = key.question(question_id) else {
            tracing::debug!("Skipping answer for question {} outside the quiz", question_id);
            continue;
        };
        let Some(choice) = choice_id.and_then(|id| question.choices.iter().find(|c| c.id == id))
        else {
            tracing::debug!("Skipping unresolvable answer for question {}", question_id);
            continue;
        };
        if !seen.insert(question_id) {
            tracing::debug!("Rejecting duplicate answer for question {}", question_id);
            continue;
        }
        resolved.push(ResolvedAnswer {
            question_id,
            choice_id: choice.id,
            is_correct: choice.is_correct,
        });
    }

    if resolved.is_empty() && !key.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No valid answers could be resolved".to_string(),
        ));
    }

    Ok(resolved)
}

fn choice_at(question: &KeyQuestion, symbol: &AnswerSymbol) -> Option<i64> {
    symbol
        .choice_index()
        .and_then(|idx| question.choices.get(idx))
        .map(|c| c.id)
}

/// `score / total * 100`, rounded to two decimals. Zero when `total` is zero.
pub fn percentage(score: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = f64::from(score) / f64::from(total) * 100.0;
    (raw * 100.0).round() / 100.0
}

/// An attempt that has been received but not scored.
#[derive(Debug, Clone)]
pub struct OpenAttempt {
    pub quiz_id: i64,
    pub player_name: String,
    pub time_spent: i32,
}

/// A scored attempt. Score, answers and question count are fixed from here on.
#[derive(Debug, Clone)]
pub struct ScoredAttempt {
    pub quiz_id: i64,
    pub player_name: String,
    pub time_spent: i32,
    pub total_questions: i32,
    pub score: i32,
    pub answers: Vec<ResolvedAnswer>,
}

impl OpenAttempt {
    pub fn score(self, submission: &Submission, key: &AnswerKey) -> Result<ScoredAttempt, AppError> {
        let answers = resolve(submission, key)?;
        let score = answers.iter().filter(|a| a.is_correct).count();
        let score = i32::try_from(score)
            .map_err(|_| AppError::BadRequest("Too many answers".to_string()))?;
        let total_questions = i32::try_from(key.len())
            .map_err(|_| AppError::InternalServerError("Quiz too large".to_string()))?;

        Ok(ScoredAttempt {
            quiz_id: self.quiz_id,
            player_name: self.player_name,
            time_spent: self.time_spent,
            total_questions,
            score,
            answers,
        })
    }
}

impl ScoredAttempt {
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total_questions)
    }

    pub fn correct_question_ids(&self) -> Vec<i64> {
        self.answers
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.question_id)
            .collect()
    }
}
