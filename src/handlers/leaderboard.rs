// src/handlers/leaderboard.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config::DEFAULT_LEADERBOARD_LIMIT,
    error::{AppError, ErrorBody},
    models::attempt::{Attempt, AttemptResponse, LeaderboardParams, QuizInfo},
};

/// Best score first; ties go to the faster, then the more recent attempt.
const RANKING: &str = "ORDER BY score DESC, time_spent ASC, created_at DESC, id DESC";

async fn top_attempts(
    pool: &PgPool,
    quiz_id: Option<i64>,
    limit: i64,
) -> Result<Vec<AttemptResponse>, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(&format!(
        "SELECT * FROM attempts WHERE ($1::INT8 IS NULL OR quiz_id = $1) {RANKING} LIMIT $2"
    ))
    .bind(quiz_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(attempts.into_iter().map(AttemptResponse::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/leaderboard/{quiz_id}",
    tag = "Leaderboard",
    params(("quiz_id" = i64, Path, description = "Quiz id"), LeaderboardParams),
    responses(
        (status = 200, description = "Ranked attempts", body = [AttemptResponse]),
        (status = 404, description = "Quiz not found", body = ErrorBody),
    ),
)]
pub async fn quiz_leaderboard(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(
        top_attempts(&pool, Some(quiz_id), params.effective_limit()).await?,
    ))
}

/// Ranking across every quiz.
#[utoipa::path(
    get,
    path = "/api/leaderboard",
    tag = "Leaderboard",
    params(LeaderboardParams),
    responses((status = 200, description = "Ranked attempts", body = [AttemptResponse])),
)]
pub async fn global_leaderboard(
    State(pool): State<PgPool>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        top_attempts(&pool, None, params.effective_limit()).await?,
    ))
}

/// Legacy summary: total number of questions plus the global leaderboard head.
#[utoipa::path(
    get,
    path = "/api/quiz-info",
    tag = "Leaderboard",
    responses((status = 200, description = "Question count and top scores", body = QuizInfo)),
)]
pub async fn quiz_info(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let size = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await?;

    let scores = top_attempts(&pool, None, DEFAULT_LEADERBOARD_LIMIT).await?;

    Ok(Json(QuizInfo { size, scores }))
}
