// src/handlers/admin.rs

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{error::AppError, services::store::rebuild_schema, utils::jwt::Claims};

/// Removes every attempt and, by cascade, every stored answer.
#[utoipa::path(
    delete,
    path = "/api/admin/attempts",
    tag = "Admin",
    responses((status = 200, description = "Attempts deleted; body is `{deleted}`")),
    security(("jwt" = [])),
)]
pub async fn cleanup_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM attempts")
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to clean up attempts: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::warn!(
        "{} deleted all {} attempts",
        claims.sub,
        result.rows_affected()
    );
    Ok(Json(json!({ "deleted": result.rows_affected() })))
}

/// Wipes every quiz, question and attempt and restores the default quizzes 1..3.
#[utoipa::path(
    post,
    path = "/api/admin/rebuild",
    tag = "Admin",
    responses((status = 200, description = "Database rebuilt; body is `{message}`")),
    security(("jwt" = [])),
)]
pub async fn rebuild(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;
    rebuild_schema(&mut *tx).await?;
    tx.commit().await?;

    tracing::warn!("{} rebuilt the database", claims.sub);
    Ok(Json(json!({ "message": "Database rebuilt successfully" })))
}
