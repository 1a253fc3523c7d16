// src/config.rs

use std::env;

use dotenvy::dotenv;

use crate::{error::AppError, utils::hash::hash_password};

/// Default number of rows returned by the leaderboard endpoints.
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;

/// Hard cap on the leaderboard page size.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Subject claim carried by every admin token.
pub const ADMIN_SUBJECT: &str = "quiz-app-admin";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub admin_password_hash: String,
    pub rust_log: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_enabled: bool,
    pub port: u16,
}

impl Config {
    /// Loads the configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::InternalServerError(format!("{key} must be set")))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = match lookup("JWT_EXPIRATION") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::InternalServerError(format!("JWT_EXPIRATION is not a number: {raw}"))
            })?,
            None => 3600,
        };

        // A precomputed hash wins over a plaintext password.
        let admin_password_hash = match lookup("ADMIN_PASSWORD_HASH") {
            Some(hash) if !hash.trim().is_empty() => hash,
            _ => {
                let password = required("ADMIN_PASSWORD").map_err(|_| {
                    AppError::InternalServerError(
                        "ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set".to_string(),
                    )
                })?;
                hash_password(&password)?
            }
        };

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let rate_limit_enabled = lookup("RATELIMIT_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                AppError::InternalServerError(format!("PORT is not a valid port: {raw}"))
            })?,
            None => 3000,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            admin_password_hash,
            rust_log,
            cors_origins,
            rate_limit_enabled,
            port,
        })
    }
}
