// src/models/attempt.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    config::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT},
    services::scoring::{Submission, percentage},
};

/// Letters, digits, spaces and `_ . ' -`.
static PLAYER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N} _.'-]+$").expect("valid player name regex"));

/// Represents the 'attempts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub player_name: String,

    /// Number of correct answers.
    pub score: i32,

    /// Quiz size when the attempt was submitted.
    pub total_questions: i32,

    /// Seconds.
    pub time_spent: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Answer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub choice_id: i64,
    pub is_correct: bool,
    pub answered_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Attempt as returned by the read endpoints and the leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttemptResponse {
    pub id: i64,
    pub quiz_id: i64,
    pub player_name: String,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub time_spent: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<Answer>>,
}

impl From<Attempt> for AttemptResponse {
    fn from(a: Attempt) -> Self {
        Self {
            id: a.id,
            quiz_id: a.quiz_id,
            player_name: a.player_name,
            score: a.score,
            total_questions: a.total_questions,
            percentage: percentage(a.score, a.total_questions),
            time_spent: a.time_spent,
            created_at: a.created_at,
            answers: None,
        }
    }
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SubmitAttemptRequest {
    #[serde(alias = "quizId")]
    pub quiz_id: i64,

    /// Trimmed on the way in, so blank names fail the length check.
    #[serde(alias = "playerName", deserialize_with = "trimmed")]
    #[validate(
        length(min = 1, max = 100, message = "Player name must be between 1 and 100 characters"),
        regex(path = *PLAYER_NAME_RE, message = "Player name contains invalid characters")
    )]
    pub player_name: String,

    pub answers: Submission,

    #[serde(default, alias = "timeSpent")]
    #[validate(range(min = 0, message = "time_spent must not be negative"))]
    pub time_spent: i32,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

/// Result of a successful submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttemptSummary {
    pub id: i64,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub time_spent: i32,
    pub correct_question_ids: Vec<i64>,
}

/// Query parameters for the leaderboard endpoints.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardParams {
    /// Defaults to 50, capped at 100.
    pub limit: Option<i64>,
}

impl LeaderboardParams {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT)
    }
}

/// Legacy `quiz-info` payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizInfo {
    pub size: i64,
    pub scores: Vec<AttemptResponse>,
}
