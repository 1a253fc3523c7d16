// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Difficulty level shared by quizzes and questions.
/// Mapped to the Postgres enum type `difficulty`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Default quiz that collects questions of this difficulty.
    pub fn default_quiz_id(self) -> i64 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// A quiz seeded by migration and restored by the admin rebuild.
#[derive(Debug, Clone, Copy)]
pub struct DefaultQuiz {
    pub id: i64,
    pub title: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
}

pub const DEFAULT_QUIZZES: [DefaultQuiz; 3] = [
    DefaultQuiz {
        id: 1,
        title: "Tennis basics (Easy)",
        description: "Rules and essentials for beginners.",
        difficulty: Difficulty::Easy,
    },
    DefaultQuiz {
        id: 2,
        title: "Roland-Garros",
        description: "The Paris clay-court tournament.",
        difficulty: Difficulty::Medium,
    },
    DefaultQuiz {
        id: 3,
        title: "Advanced tennis / technique",
        description: "Grips, spin and tactics.",
        difficulty: Difficulty::Hard,
    },
];

/// A quiz reference: a numeric id, a numeric string, or a legacy alias.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum QuizRef {
    Id(i64),
    Name(String),
}

impl QuizRef {
    /// Resolves aliases (`bases`/`easy` → 1, `roland`/`medium` → 2,
    /// `avance`/`advanced`/`hard` → 3). Unknown names are rejected.
    pub fn resolve(&self) -> Result<i64, AppError> {
        let name = match self {
            QuizRef::Id(id) => return Ok(*id),
            QuizRef::Name(name) => name.trim().to_lowercase(),
        };
        if let Ok(id) = name.parse::<i64>() {
            return Ok(id);
        }
        match name.as_str() {
            "bases" | "easy" => Ok(Difficulty::Easy.default_quiz_id()),
            "roland" | "medium" => Ok(Difficulty::Medium.default_quiz_id()),
            "avance" | "advanced" | "hard" => Ok(Difficulty::Hard.default_quiz_id()),
            _ => Err(AppError::BadRequest(format!("Unknown quiz: {name}"))),
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub is_published: bool,

    /// Number of questions currently attached, computed by the listing queries.
    #[sqlx(default)]
    pub question_count: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

fn default_published() -> bool {
    true
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub is_published: Option<bool>,
}

impl UpdateQuizRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.difficulty.is_none()
            && self.is_published.is_none()
    }
}
