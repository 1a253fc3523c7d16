// src/handlers/attempt.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    error::{AppError, ErrorBody},
    models::attempt::{Answer, Attempt, AttemptResponse, AttemptSummary, SubmitAttemptRequest},
    services::{
        scoring::OpenAttempt,
        store::{load_answer_key, persist_attempt},
    },
};

/// Scores a submission against the quiz as it is now and stores it.
///
/// The attempt and its answers are written in one transaction. The quiz row is
/// share-locked so a concurrent reindex cannot change the key mid-read.
pub async fn submit_attempt(
    conn: &mut PgConnection,
    request: SubmitAttemptRequest,
) -> Result<AttemptSummary, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR SHARE")
        .bind(request.quiz_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let key = load_answer_key(&mut *conn, request.quiz_id).await?;

    let scored = OpenAttempt {
        quiz_id: request.quiz_id,
        player_name: request.player_name.trim().to_string(),
        time_spent: request.time_spent,
    }
    .score(&request.answers, &key)?;

    let id = persist_attempt(&mut *conn, &scored).await?;

    tracing::info!(
        "Attempt {} by '{}' on quiz {}: {}/{}",
        id,
        scored.player_name,
        scored.quiz_id,
        scored.score,
        scored.total_questions
    );

    Ok(AttemptSummary {
        id,
        score: scored.score,
        total_questions: scored.total_questions,
        percentage: scored.percentage(),
        time_spent: scored.time_spent,
        correct_question_ids: scored.correct_question_ids(),
    })
}

/// Submits a quiz attempt.
///
/// `answers` is either a list of `{question_id, choice_id | answer}` objects or
/// a positional list with one letter/index per question.
#[utoipa::path(
    post,
    path = "/api/attempts",
    tag = "Attempts",
    request_body = SubmitAttemptRequest,
    responses(
        (status = 201, description = "Attempt scored and stored", body = AttemptSummary),
        (status = 400, description = "Malformed payload", body = ErrorBody),
        (status = 404, description = "Quiz not found", body = ErrorBody),
        (status = 422, description = "Answers cannot be scored", body = ErrorBody),
    ),
)]
pub async fn create_attempt(
    State(pool): State<PgPool>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;
    let summary = submit_attempt(&mut *tx, payload).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

#[utoipa::path(
    get,
    path = "/api/attempts/{id}",
    tag = "Attempts",
    params(("id" = i64, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Attempt with its answers", body = AttemptResponse),
        (status = 404, description = "Attempt not found", body = ErrorBody),
    ),
)]
pub async fn get_attempt(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    let answers = sqlx::query_as::<_, Answer>(
        "SELECT * FROM answers WHERE attempt_id = $1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let mut response = AttemptResponse::from(attempt);
    response.answers = Some(answers);
    Ok(Json(response))
}

/// A player's attempts, newest first.
#[utoipa::path(
    get,
    path = "/api/attempts/player/{player_name}",
    tag = "Attempts",
    params(("player_name" = String, Path, description = "Player name")),
    responses((status = 200, description = "Attempts", body = [AttemptResponse])),
)]
pub async fn list_player_attempts(
    State(pool): State<PgPool>,
    Path(player_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = sqlx::query_as::<_, Attempt>(
        "SELECT * FROM attempts WHERE player_name = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(player_name.trim())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list attempts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(
        attempts
            .into_iter()
            .map(AttemptResponse::from)
            .collect::<Vec<_>>(),
    ))
}
