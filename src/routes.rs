// src/routes.rs

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ErrorBody,
    handlers::{admin, attempt, auth, leaderboard, question, quiz},
    models::{
        attempt::{Answer, AttemptResponse, AttemptSummary, QuizInfo, SubmitAttemptRequest},
        question::{
            ChoiceInput, ChoiceResponse, ChoicesInput, QuestionPayload, QuestionResponse,
            UpdateQuestionRequest,
        },
        quiz::{CreateQuizRequest, Difficulty, Quiz, QuizRef, UpdateQuizRequest},
    },
    services::scoring::{AnswerEntry, AnswerSymbol, Submission},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Quiz API", description = "Quiz backend: questions, attempts and leaderboards"),
    paths(
        health,
        auth::login,
        quiz::list_quizzes,
        quiz::get_quiz,
        quiz::list_quiz_questions,
        quiz::create_quiz,
        quiz::update_quiz,
        quiz::delete_quiz,
        question::list_questions,
        question::get_question,
        question::create_question,
        question::update_question,
        question::delete_question,
        question::bulk_import,
        question::delete_all_questions,
        attempt::create_attempt,
        attempt::get_attempt,
        attempt::list_player_attempts,
        leaderboard::quiz_leaderboard,
        leaderboard::global_leaderboard,
        leaderboard::quiz_info,
        admin::cleanup_attempts,
        admin::rebuild,
    ),
    components(schemas(
        ErrorBody,
        auth::LoginRequest,
        auth::TokenResponse,
        Difficulty,
        QuizRef,
        Quiz,
        CreateQuizRequest,
        UpdateQuizRequest,
        QuestionResponse,
        ChoiceResponse,
        QuestionPayload,
        ChoicesInput,
        ChoiceInput,
        UpdateQuestionRequest,
        SubmitAttemptRequest,
        Submission,
        AnswerEntry,
        AnswerSymbol,
        AttemptSummary,
        AttemptResponse,
        Answer,
        QuizInfo,
    )),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up")),
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Assembles the main application router.
///
/// Admin routes go through `auth_middleware` first, then the role check.
/// Rate limiting is per peer IP, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` when it is on.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}", get(quiz::get_quiz))
        .route("/{id}/questions", get(quiz::list_quiz_questions));

    let question_routes = Router::new()
        .route("/", get(question::list_questions))
        .route("/{id}", get(question::get_question));

    let attempt_routes = Router::new()
        .route("/", post(attempt::create_attempt))
        .route("/{id}", get(attempt::get_attempt))
        .route("/player/{player_name}", get(attempt::list_player_attempts));

    let leaderboard_routes = Router::new()
        .route("/", get(leaderboard::global_leaderboard))
        .route("/{quiz_id}", get(leaderboard::quiz_leaderboard));

    let admin_routes = Router::new()
        .route("/quizzes", post(quiz::create_quiz))
        .route(
            "/quizzes/{id}",
            put(quiz::update_quiz).delete(quiz::delete_quiz),
        )
        .route(
            "/questions",
            post(question::create_question).delete(question::delete_all_questions),
        )
        .route("/questions/bulk", post(question::bulk_import))
        .route(
            "/questions/{id}",
            put(question::update_question).delete(question::delete_question),
        )
        .route("/attempts", delete(admin::cleanup_attempts))
        .route("/rebuild", post(admin::rebuild))
        // Auth first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/quiz-info", get(leaderboard::quiz_info))
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        .nest("/api/admin", admin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let router = if state.config.rate_limit_enabled {
        match GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .finish()
        {
            Some(governor_conf) => {
                tracing::info!("Rate limiting enabled: 2 req/s, burst 5");
                router.layer(GovernorLayer::new(Arc::new(governor_conf)))
            }
            None => {
                tracing::warn!("Invalid rate limit configuration; rate limiting disabled");
                router
            }
        }
    } else {
        router
    };

    // Global Middleware (applied from outside in)
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
