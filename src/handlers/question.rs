// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, types::Json as DbJson};
use validator::Validate;

use crate::{
    error::{AppError, ErrorBody},
    models::question::{
        BulkImportParams, Question, QuestionDraft, QuestionListParams, QuestionPayload,
        QuestionResponse, UpdateQuestionRequest, clean_tags,
    },
    services::{
        reindex,
        store::{replace_choices, with_choices},
    },
    utils::html::clean_html,
};

/// Legacy clients ask for `?position=` without a quiz.
const DEFAULT_QUIZ_ID: i64 = 1;

/// Lists questions, or returns the single question at `position`.
///
/// With `position` the question is returned with correctness revealed;
/// lists are always masked.
#[utoipa::path(
    get,
    path = "/api/questions",
    tag = "Questions",
    params(QuestionListParams),
    responses(
        (status = 200, description = "One question (with position) or a list", body = [QuestionResponse]),
        (status = 404, description = "No question at that position", body = ErrorBody),
    ),
)]
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<QuestionListParams>,
) -> Result<axum::response::Response, AppError> {
    let mut conn = pool.acquire().await?;

    if let Some(position) = params.position {
        let quiz_id = params.quiz_id.unwrap_or(DEFAULT_QUIZ_ID);
        let question = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE quiz_id = $1 AND position = $2",
        )
        .bind(quiz_id)
        .bind(position)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound(format!(
            "No question at position {position} of quiz {quiz_id}"
        )))?;

        let view = single_view(&mut *conn, question).await?;
        return Ok(Json(view).into_response());
    }

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT * FROM questions
        WHERE ($1::INT8 IS NULL OR quiz_id = $1)
        ORDER BY quiz_id, position
        "#,
    )
    .bind(params.quiz_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(with_choices(&mut *conn, questions, false).await?).into_response())
}

/// One question, with correctness and explanation.
#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    tag = "Questions",
    params(("id" = i64, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question", body = QuestionResponse),
        (status = 404, description = "Question not found", body = ErrorBody),
    ),
)]
pub async fn get_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;

    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(single_view(&mut *conn, question).await?))
}

async fn single_view(
    conn: &mut PgConnection,
    question: Question,
) -> Result<QuestionResponse, AppError> {
    with_choices(conn, vec![question], true)
        .await?
        .pop()
        .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Creates a question at the requested position (appends by default).
#[utoipa::path(
    post,
    path = "/api/admin/questions",
    tag = "Admin",
    request_body = QuestionPayload,
    responses(
        (status = 201, description = "Question created; body is `{id, position}`"),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 404, description = "Quiz not found", body = ErrorBody),
        (status = 409, description = "Concurrent reindex collision", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<QuestionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = payload
        .target_quiz()?
        .ok_or(AppError::BadRequest("Missing field: quiz_id".to_string()))?;
    let requested = payload.position;
    let draft = payload.into_draft()?;

    let mut tx = pool.begin().await?;
    let placement = reindex::insert_at(&mut *tx, quiz_id, &draft, requested).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": placement.question_id, "position": placement.position })),
    ))
}

/// Applies a question update on `conn`: fields, then choices, then position.
///
/// The owning quiz is locked before the first row write, the same order every
/// reindex uses, so an edit never deadlocks against a concurrent reindex.
pub async fn apply_question_update(
    conn: &mut PgConnection,
    id: i64,
    payload: UpdateQuestionRequest,
) -> Result<(), AppError> {
    let (quiz_id, _) = reindex::lock_question(&mut *conn, id).await?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");
    let mut has_fields = false;

    if let Some(title) = &payload.title {
        separated.push("title = ").push_bind_unseparated(clean_html(title));
        has_fields = true;
    }
    if let Some(text) = &payload.text {
        separated.push("text = ").push_bind_unseparated(clean_html(text));
        has_fields = true;
    }
    if let Some(image) = &payload.image {
        let image = Some(image.trim().to_string()).filter(|i| !i.is_empty());
        separated.push("image = ").push_bind_unseparated(image);
        has_fields = true;
    }
    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ").push_bind_unseparated(difficulty);
        has_fields = true;
    }
    if let Some(tags) = &payload.tags {
        separated
            .push("tags = ")
            .push_bind_unseparated(DbJson(clean_tags(tags.clone())));
        has_fields = true;
    }
    if let Some(explanation) = &payload.explanation {
        let explanation = Some(clean_html(explanation)).filter(|e| !e.is_empty());
        separated.push("explanation = ").push_bind_unseparated(explanation);
        has_fields = true;
    }

    if has_fields {
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder.build().execute(&mut *conn).await.map_err(|e| {
            tracing::error!("Failed to update question {}: {:?}", id, e);
            AppError::from(e)
        })?;
    }

    if let Some(choices) = payload.choices {
        let drafts: Vec<_> = choices.into_iter().map(|c| c.into_draft()).collect();
        replace_choices(&mut *conn, id, &drafts).await?;
    }

    if let Some(position) = payload.position {
        reindex::move_to(&mut *conn, id, position).await?;
    }

    tracing::info!("Updated question {} of quiz {}", id, quiz_id);
    Ok(())
}

/// Updates fields, replaces choices and moves the question, in one transaction.
#[utoipa::path(
    put,
    path = "/api/admin/questions/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Question id")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 204, description = "Question updated"),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 404, description = "Question not found", body = ErrorBody),
        (status = 409, description = "Removed choices are referenced by attempts, or a reindex collided", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;
    apply_question_update(&mut *tx, id, payload).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a question and closes the gap in its quiz.
#[utoipa::path(
    delete,
    path = "/api/admin/questions/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Question id")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;
    reindex::remove(&mut *tx, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Imports a batch of questions. All or nothing.
///
/// `?quiz_id=` overrides every item's quiz. Items without a quiz land in the
/// default quiz of their difficulty.
#[utoipa::path(
    post,
    path = "/api/admin/questions/bulk",
    tag = "Admin",
    params(BulkImportParams),
    request_body = [QuestionPayload],
    responses(
        (status = 200, description = "Batch imported; body is `{inserted}`"),
        (status = 400, description = "An item failed validation", body = ErrorBody),
        (status = 404, description = "Quiz not found", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn bulk_import(
    State(pool): State<PgPool>,
    Query(params): Query<BulkImportParams>,
    Json(payloads): Json<Vec<QuestionPayload>>,
) -> Result<impl IntoResponse, AppError> {
    let forced = params.forced_quiz()?;

    let mut items: Vec<(i64, Option<i32>, QuestionDraft)> = Vec::with_capacity(payloads.len());
    for (idx, payload) in payloads.into_iter().enumerate() {
        let item_error = |e: AppError| match e {
            AppError::BadRequest(msg) => AppError::BadRequest(format!("Item {idx}: {msg}")),
            other => other,
        };
        let quiz_id = match forced {
            Some(quiz_id) => quiz_id,
            None => payload
                .target_quiz()
                .map_err(item_error)?
                .unwrap_or_else(|| payload.fallback_quiz()),
        };
        let requested = payload.position;
        let draft = payload.into_draft().map_err(item_error)?;
        items.push((quiz_id, requested, draft));
    }

    let mut tx = pool.begin().await?;
    for (quiz_id, requested, draft) in &items {
        reindex::insert_at(&mut *tx, *quiz_id, draft, *requested).await?;
    }
    tx.commit().await?;

    tracing::info!("Bulk imported {} questions", items.len());
    Ok(Json(json!({ "inserted": items.len() })))
}

/// Deletes every question with its choices and answers.
#[utoipa::path(
    delete,
    path = "/api/admin/questions",
    tag = "Admin",
    responses((status = 200, description = "Questions deleted; body is `{deleted}`")),
    security(("jwt" = [])),
)]
pub async fn delete_all_questions(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions")
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::warn!("Deleted all {} questions", result.rows_affected());
    Ok(Json(json!({ "deleted": result.rows_affected() })))
}
