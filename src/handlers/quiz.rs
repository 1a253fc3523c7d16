// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, ErrorBody},
    models::{
        question::{Question, QuestionResponse},
        quiz::{CreateQuizRequest, Quiz, UpdateQuizRequest},
    },
    services::store::with_choices,
};

const QUIZ_COLUMNS: &str = r#"
    q.id, q.title, q.description, q.difficulty, q.is_published, q.created_at,
    (SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = q.id) AS question_count
"#;

/// Lists published quizzes with their question counts.
#[utoipa::path(
    get,
    path = "/api/quizzes",
    tag = "Quizzes",
    responses((status = 200, description = "Published quizzes", body = [Quiz])),
)]
pub async fn list_quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes q WHERE q.is_published ORDER BY q.id"
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

#[utoipa::path(
    get,
    path = "/api/quizzes/{id}",
    tag = "Quizzes",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Quiz", body = Quiz),
        (status = 404, description = "Quiz not found", body = ErrorBody),
    ),
)]
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes q WHERE q.id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}

/// Questions of a quiz in position order, correctness masked.
#[utoipa::path(
    get,
    path = "/api/quizzes/{id}/questions",
    tag = "Quizzes",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 200, description = "Questions in position order", body = [QuestionResponse]),
        (status = 404, description = "Quiz not found", body = ErrorBody),
    ),
)]
pub async fn list_quiz_questions(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Json(with_choices(&mut *conn, questions, false).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/quizzes",
    tag = "Admin",
    request_body = CreateQuizRequest,
    responses(
        (status = 201, description = "Quiz created"),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("jwt" = [])),
)]
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO quizzes (title, description, difficulty, is_published)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.difficulty)
    .bind(payload.is_published)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!("Created quiz {}", id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Partial update; only the provided fields change.
#[utoipa::path(
    put,
    path = "/api/admin/quizzes/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Quiz id")),
    request_body = UpdateQuizRequest,
    responses(
        (status = 200, description = "Quiz updated"),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 404, description = "Quiz not found", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = &payload.title {
        separated.push("title = ").push_bind_unseparated(title.trim().to_string());
    }
    if let Some(description) = &payload.description {
        separated.push("description = ").push_bind_unseparated(description.clone());
    }
    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ").push_bind_unseparated(difficulty);
    }
    if let Some(is_published) = payload.is_published {
        separated.push("is_published = ").push_bind_unseparated(is_published);
    }
    separated.push("updated_at = NOW()");

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz {}: {:?}", id, e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(Json(json!({ "message": "Quiz updated successfully" })))
}

/// Deletes a quiz with its questions, choices, attempts and answers.
#[utoipa::path(
    delete,
    path = "/api/admin/quizzes/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Quiz id")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 404, description = "Quiz not found", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!("Deleted quiz {}", id);
    Ok(StatusCode::NO_CONTENT)
}
