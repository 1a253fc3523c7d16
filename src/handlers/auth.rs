// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, ErrorBody},
    utils::{hash::verify_password, jwt::sign_admin_token},
};

/// DTO for the admin login.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 128, message = "Password must not be empty"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Authenticates the administrator and returns a JWT token.
///
/// There is a single admin account; the password is checked against the
/// configured Argon2 hash.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Malformed payload", body = ErrorBody),
        (status = 401, description = "Wrong password", body = ErrorBody),
    ),
)]
pub async fn login(
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if !verify_password(&payload.password, &config.admin_password_hash)? {
        tracing::warn!("Rejected admin login attempt");
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_admin_token(&config)?;
    tracing::info!("Admin token issued");

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
    }))
}
