// tests/flow_tests.rs

//! End-to-end flows against a real Postgres. Every test is skipped when
//! `DATABASE_URL` is not set. Each test works on its own quiz.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use quiz_backend::{
    config::Config,
    error::AppError,
    handlers::question::apply_question_update,
    models::question::{QuestionDraft, UpdateQuestionRequest},
    routes,
    services::reindex::{self, PositionStore},
    state::AppState,
    utils::hash::hash_password,
};
use serde_json::{Value, json};
use sqlx::{PgConnection, PgPool, postgres::PgPoolOptions};

const ADMIN_PASSWORD: &str = "iloveflask";

struct TestApp {
    address: String,
    client: reqwest::Client,
    token: String,
    player: String,
    pool: PgPool,
}

/// Spawns the app on a random port and logs in as admin.
/// Returns `None` when no database is configured.
async fn spawn_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url,
        jwt_secret: "test_secret_for_flow_tests".to_string(),
        jwt_expiration: 600,
        admin_password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
        rust_log: "error".to_string(),
        cors_origins: vec![],
        rate_limit_enabled: false,
        port: 0,
    };

    let app = routes::create_router(AppState::new(pool.clone(), config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let player = format!("player-{}", &uuid::Uuid::new_v4().to_string()[..8]);

    Some(TestApp { address, client, token, player, pool })
}

impl TestApp {
    async fn create_quiz(&self) -> i64 {
        let title = format!("Quiz {}", &uuid::Uuid::new_v4().to_string()[..8]);
        let response = self
            .client
            .post(format!("{}/api/admin/quizzes", self.address))
            .bearer_auth(&self.token)
            .json(&json!({ "title": title }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    /// Creates a question whose text is `text`; returns `(id, position)`.
    async fn add_question(&self, quiz_id: i64, text: &str, position: Option<i32>) -> (i64, i64) {
        let mut payload = json!({
            "quiz_id": quiz_id,
            "text": text,
            "choices": { "A": "first", "B": "second", "C": "third" },
            "correct": "A"
        });
        if let Some(position) = position {
            payload["position"] = json!(position);
        }

        let response = self
            .client
            .post(format!("{}/api/admin/questions", self.address))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        (body["id"].as_i64().unwrap(), body["position"].as_i64().unwrap())
    }

    /// `(text, position)` of every question in position order.
    async fn layout(&self, quiz_id: i64) -> Vec<(String, i64)> {
        let body: Value = self
            .client
            .get(format!("{}/api/quizzes/{}/questions", self.address, quiz_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        body.as_array()
            .unwrap()
            .iter()
            .map(|q| {
                (
                    q["text"].as_str().unwrap().to_string(),
                    q["position"].as_i64().unwrap(),
                )
            })
            .collect()
    }

    /// Id of the question whose text is `text`.
    async fn question_id(&self, quiz_id: i64, text: &str) -> i64 {
        let body: Value = self
            .client
            .get(format!("{}/api/quizzes/{}/questions", self.address, quiz_id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        body.as_array()
            .unwrap()
            .iter()
            .find(|q| q["text"] == text)
            .and_then(|q| q["id"].as_i64())
            .unwrap()
    }

    async fn put_question(&self, id: i64, body: Value) -> reqwest::Response {
        self.client
            .put(format!("{}/api/admin/questions/{}", self.address, id))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn submit(&self, quiz_id: i64, answers: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/attempts", self.address))
            .json(&json!({
                "quiz_id": quiz_id,
                "player_name": self.player,
                "answers": answers,
                "time_spent": 42
            }))
            .send()
            .await
            .unwrap()
    }
}

fn texts(layout: &[(String, i64)]) -> Vec<&str> {
    layout.iter().map(|(t, _)| t.as_str()).collect()
}

fn assert_dense(layout: &[(String, i64)]) {
    let positions: Vec<i64> = layout.iter().map(|(_, p)| *p).collect();
    let expected: Vec<i64> = (1..=layout.len() as i64).collect();
    assert_eq!(positions, expected);
}

#[tokio::test]
async fn insert_move_delete_keep_positions_dense() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;

    let mut ids = Vec::new();
    for text in ["q1", "q2", "q3", "q4", "q5"] {
        ids.push(app.add_question(quiz_id, text, None).await.0);
    }
    assert_eq!(texts(&app.layout(quiz_id).await), ["q1", "q2", "q3", "q4", "q5"]);

    // Insert in the middle shifts the tail.
    let (_, position) = app.add_question(quiz_id, "new", Some(2)).await;
    assert_eq!(position, 2);
    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["q1", "new", "q2", "q3", "q4", "q5"]);
    assert_dense(&layout);

    // Out-of-range positions clamp to the end.
    let (_, position) = app.add_question(quiz_id, "tail", Some(99)).await;
    assert_eq!(position, 7);

    // Move q3 (position 4) to the front.
    let response = app
        .client
        .put(format!("{}/api/admin/questions/{}", app.address, ids[2]))
        .bearer_auth(&app.token)
        .json(&json!({ "position": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["q3", "q1", "new", "q2", "q4", "q5", "tail"]);
    assert_dense(&layout);

    // Delete q1 closes the gap.
    let response = app
        .client
        .delete(format!("{}/api/admin/questions/{}", app.address, ids[0]))
        .bearer_auth(&app.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["q3", "new", "q2", "q4", "q5", "tail"]);
    assert_dense(&layout);

    // Deleting it again is a 404.
    let response = app
        .client
        .delete(format!("{}/api/admin/questions/{}", app.address, ids[0]))
        .bearer_auth(&app.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn move_down_and_field_update_share_a_transaction() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;

    let mut ids = Vec::new();
    for text in ["q1", "q2", "q3", "q4", "q5"] {
        ids.push(app.add_question(quiz_id, text, None).await.0);
    }

    let response = app
        .client
        .put(format!("{}/api/admin/questions/{}", app.address, ids[0]))
        .bearer_auth(&app.token)
        .json(&json!({ "title": "renamed", "position": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["q2", "q3", "q4", "q1", "q5"]);
    assert_dense(&layout);

    let question: Value = app
        .client
        .get(format!("{}/api/questions/{}", app.address, ids[0]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(question["title"], "renamed");
    assert_eq!(question["position"], 4);
}

#[tokio::test]
async fn insert_into_missing_quiz_is_404() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .post(format!("{}/api/admin/questions", app.address))
        .bearer_auth(&app.token)
        .json(&json!({ "quiz_id": i64::MAX, "text": "orphan" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn letter_and_positional_submissions_score_alike() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;

    // Q1: correct is the 1st choice. Q2: correct is the 2nd.
    let q1 = app.add_question(quiz_id, "q1", None).await.0;
    let response = app
        .client
        .post(format!("{}/api/admin/questions", app.address))
        .bearer_auth(&app.token)
        .json(&json!({
            "quiz_id": quiz_id,
            "question": "q2",
            "possibleAnswers": ["one", "two", "three"],
            "correctIndex": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let q2 = response.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let explicit = app
        .submit(
            quiz_id,
            json!([
                { "question_id": q1, "answer": "A" },
                { "question_id": q2, "answer": "C" }
            ]),
        )
        .await;
    assert_eq!(explicit.status().as_u16(), 201);
    let summary: Value = explicit.json().await.unwrap();
    assert_eq!(summary["score"], 1);
    assert_eq!(summary["total_questions"], 2);
    assert_eq!(summary["percentage"], 50.0);
    assert_eq!(summary["correct_question_ids"], json!([q1]));

    let positional = app.submit(quiz_id, json!([1, 2])).await;
    assert_eq!(positional.status().as_u16(), 201);
    let summary: Value = positional.json().await.unwrap();
    assert_eq!(summary["score"], 2);
    assert_eq!(summary["percentage"], 100.0);
    let attempt_id = summary["id"].as_i64().unwrap();

    let short = app.submit(quiz_id, json!([1])).await;
    assert_eq!(short.status().as_u16(), 422);

    // Stored answers come back with the attempt.
    let attempt: Value = app
        .client
        .get(format!("{}/api/attempts/{}", app.address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["answers"].as_array().unwrap().len(), 2);
    assert_eq!(attempt["time_spent"], 42);

    // The perfect attempt leads this quiz's leaderboard.
    let board: Value = app
        .client
        .get(format!("{}/api/leaderboard/{}?limit=1", app.address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0]["id"], attempt_id);

    // The rejected short submission left nothing behind.
    let mine: Value = app
        .client
        .get(format!("{}/api/attempts/player/{}", app.address, app.player))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0]["id"], attempt_id);
}

#[tokio::test]
async fn choice_ids_from_another_question_are_skipped() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;
    let q1 = app.add_question(quiz_id, "q1", None).await.0;
    let q2 = app.add_question(quiz_id, "q2", None).await.0;

    let question: Value = app
        .client
        .get(format!("{}/api/questions/{}", app.address, q2))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let foreign_correct = question["possibleAnswers"][0]["id"].as_i64().unwrap();
    assert_eq!(question["possibleAnswers"][0]["isCorrect"], true);

    let response = app
        .submit(
            quiz_id,
            json!([
                { "question_id": q1, "choice_id": foreign_correct },
                { "question_id": q2, "choice_id": foreign_correct }
            ]),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(summary["score"], 1);
    assert_eq!(summary["correct_question_ids"], json!([q2]));
}

#[tokio::test]
async fn submission_to_missing_quiz_is_404() {
    let Some(app) = spawn_app().await else { return };

    let response = app.submit(i64::MAX, json!(["A"])).await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn question_by_position_reveals_correctness_lists_do_not() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;
    app.add_question(quiz_id, "q1", None).await;

    let single: Value = app
        .client
        .get(format!("{}/api/questions?quiz_id={}&position=1", app.address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(single["possibleAnswers"][0]["isCorrect"], true);

    let list: Value = app
        .client
        .get(format!("{}/api/questions?quiz_id={}", app.address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert!(
        list[0]["possibleAnswers"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["isCorrect"] == false)
    );

    let missing = app
        .client
        .get(format!("{}/api/questions?quiz_id={}&position=9", app.address, quiz_id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn bulk_import_is_all_or_nothing() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;
    app.add_question(quiz_id, "existing", None).await;

    let response = app
        .client
        .post(format!("{}/api/admin/questions/bulk?quiz_id={}", app.address, quiz_id))
        .bearer_auth(&app.token)
        .json(&json!([
            { "text": "front", "position": 1, "choices": ["x", "y"], "correct_index": 0 },
            { "text": "back", "choices": [{ "text": "x", "isCorrect": true }] }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["inserted"], 2);

    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["front", "existing", "back"]);
    assert_dense(&layout);

    // A batch naming a missing quiz rolls back entirely.
    let response = app
        .client
        .post(format!("{}/api/admin/questions/bulk", app.address))
        .bearer_auth(&app.token)
        .json(&json!([
            { "quiz_id": quiz_id, "text": "would be fourth" },
            { "quiz_id": i64::MAX, "text": "orphan" }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(app.layout(quiz_id).await.len(), 3);
}

#[tokio::test]
async fn deleting_a_quiz_removes_its_attempts() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;
    app.add_question(quiz_id, "q1", None).await;

    let summary: Value = app.submit(quiz_id, json!(["A"])).await.json().await.unwrap();
    let attempt_id = summary["id"].as_i64().unwrap();

    let response = app
        .client
        .delete(format!("{}/api/admin/quizzes/{}", app.address, quiz_id))
        .bearer_auth(&app.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = app
        .client
        .get(format!("{}/api/attempts/{}", app.address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn edit_then_move_serializes_with_a_concurrent_delete() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;

    let mut ids = Vec::new();
    for text in ["q1", "q2", "q3", "q4"] {
        ids.push(app.add_question(quiz_id, text, None).await.0);
    }

    // A edits q3 first, holding its transaction open.
    let mut edit = app.pool.begin().await.unwrap();
    let fields: UpdateQuestionRequest = serde_json::from_value(json!({ "title": "edited" })).unwrap();
    apply_question_update(&mut *edit, ids[2], fields).await.unwrap();

    // B deletes q1 meanwhile; it must wait for A's quiz lock.
    let pool = app.pool.clone();
    let q1 = ids[0];
    let delete = tokio::spawn(async move {
        let mut tx = pool.begin().await?;
        reindex::remove(&mut *tx, q1).await?;
        tx.commit().await?;
        Ok::<(), AppError>(())
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!delete.is_finished());

    // A then moves q3 to the front and commits.
    reindex::move_to(&mut *edit, ids[2], 1).await.unwrap();
    edit.commit().await.unwrap();

    delete.await.unwrap().unwrap();

    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["q3", "q2", "q4"]);
    assert_dense(&layout);
    let question = app.get_json(&format!("/api/questions/{}", ids[2])).await;
    assert_eq!(question["title"], "edited");
}

#[tokio::test]
async fn editing_choices_keeps_answers_of_past_attempts() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;
    let (q1, _) = app.add_question(quiz_id, "q1", None).await;

    let before = app.get_json(&format!("/api/questions/{}", q1)).await;
    let choice_ids: Vec<i64> = before["possibleAnswers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(choice_ids.len(), 3);

    // Answer the third choice.
    let summary: Value = app
        .submit(quiz_id, json!([{ "question_id": q1, "answer": "C" }]))
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = summary["id"].as_i64().unwrap();

    // Rewording the same number of choices keeps their ids.
    let response = app
        .put_question(
            q1,
            json!({ "choices": [
                { "text": "uno", "is_correct": true },
                { "text": "dos" },
                { "text": "tres" }
            ] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 204);

    let after = app.get_json(&format!("/api/questions/{}", q1)).await;
    let after_ids: Vec<i64> = after["possibleAnswers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(after_ids, choice_ids);
    assert_eq!(after["possibleAnswers"][2]["text"], "tres");

    // Dropping the answered choice is refused and changes nothing.
    let response = app
        .put_question(q1, json!({ "title": "shrunk", "choices": [{ "text": "uno", "is_correct": true }] }))
        .await;
    assert_eq!(response.status().as_u16(), 409);
    let unchanged = app.get_json(&format!("/api/questions/{}", q1)).await;
    assert_eq!(unchanged["possibleAnswers"].as_array().unwrap().len(), 3);
    assert_ne!(unchanged["title"], "shrunk");

    let attempt = app.get_json(&format!("/api/attempts/{}", attempt_id)).await;
    let answers = attempt["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0]["choice_id"], choice_ids[2]);
    assert_eq!(attempt["score"], 0);

    // Growing the set appends after the kept choices.
    let response = app
        .put_question(
            q1,
            json!({ "choices": [
                { "text": "uno", "is_correct": true },
                { "text": "dos" },
                { "text": "tres" },
                { "text": "cuatro" }
            ] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 204);
    let grown = app.get_json(&format!("/api/questions/{}", q1)).await;
    let grown = grown["possibleAnswers"].as_array().unwrap();
    assert_eq!(grown.len(), 4);
    assert_eq!(grown[2]["id"], choice_ids[2]);
}

#[tokio::test]
async fn default_quizzes_are_seeded_and_aliases_resolve() {
    let Some(app) = spawn_app().await else { return };

    for id in 1..=3 {
        let response = app
            .client
            .get(format!("{}/api/quizzes/{}", app.address, id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let tag = &uuid::Uuid::new_v4().to_string()[..8];
    let by_alias = format!("alias {tag}");
    let by_difficulty = format!("difficulty {tag}");

    let response = app
        .client
        .post(format!("{}/api/admin/questions/bulk", app.address))
        .bearer_auth(&app.token)
        .json(&json!([
            { "quizId": "avance", "text": by_alias },
            { "text": by_difficulty, "difficulty": "medium" }
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let hard = app.question_id(3, &by_alias).await;
    let medium = app.question_id(2, &by_difficulty).await;

    let response = app
        .client
        .post(format!("{}/api/admin/questions/bulk?quiz_id=wimbledon", app.address))
        .bearer_auth(&app.token)
        .json(&json!([{ "text": "nowhere" }]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    for id in [hard, medium] {
        let response = app
            .client
            .delete(format!("{}/api/admin/questions/{}", app.address, id))
            .bearer_auth(&app.token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 204);
    }
}

/// Delegates to Postgres but fails the lowering step of a band shift.
struct FailingStore<'a> {
    conn: &'a mut PgConnection,
    shifts: usize,
}

#[async_trait]
impl PositionStore for FailingStore<'_> {
    async fn lock_quiz(&mut self, quiz_id: i64) -> Result<(), AppError> {
        self.conn.lock_quiz(quiz_id).await
    }

    async fn question_count(&mut self, quiz_id: i64) -> Result<i32, AppError> {
        self.conn.question_count(quiz_id).await
    }

    async fn locate(&mut self, question_id: i64) -> Result<Option<(i64, i32)>, AppError> {
        self.conn.locate(question_id).await
    }

    async fn set_position(&mut self, question_id: i64, position: i32) -> Result<(), AppError> {
        self.conn.set_position(question_id, position).await
    }

    async fn offset_positions(
        &mut self,
        quiz_id: i64,
        from: i32,
        to: Option<i32>,
        offset: i32,
    ) -> Result<u64, AppError> {
        self.shifts += 1;
        if self.shifts > 1 {
            return Err(AppError::InternalServerError("store went away".to_string()));
        }
        self.conn.offset_positions(quiz_id, from, to, offset).await
    }

    async fn insert_question(
        &mut self,
        quiz_id: i64,
        position: i32,
        draft: &QuestionDraft,
    ) -> Result<i64, AppError> {
        self.conn.insert_question(quiz_id, position, draft).await
    }

    async fn delete_question(&mut self, question_id: i64) -> Result<(), AppError> {
        self.conn.delete_question(question_id).await
    }
}

#[tokio::test]
async fn failed_move_or_delete_leaves_layout_untouched() {
    let Some(app) = spawn_app().await else { return };
    let quiz_id = app.create_quiz().await;

    let mut ids = Vec::new();
    for text in ["q1", "q2", "q3", "q4"] {
        ids.push(app.add_question(quiz_id, text, None).await.0);
    }
    let original = app.layout(quiz_id).await;

    // Move q1 to the end: the vacancy and the lift are written, the lowering fails.
    let mut tx = app.pool.begin().await.unwrap();
    let mut store = FailingStore { conn: &mut *tx, shifts: 0 };
    let err = reindex::move_to(&mut store, ids[0], 4).await.unwrap_err();
    assert!(matches!(err, AppError::InternalServerError(_)));
    tx.rollback().await.unwrap();
    assert_eq!(app.layout(quiz_id).await, original);

    // Same for deleting q2.
    let mut tx = app.pool.begin().await.unwrap();
    let mut store = FailingStore { conn: &mut *tx, shifts: 0 };
    let err = reindex::remove(&mut store, ids[1]).await.unwrap_err();
    assert!(matches!(err, AppError::InternalServerError(_)));
    tx.rollback().await.unwrap();
    assert_eq!(app.layout(quiz_id).await, original);

    // And the store still works afterwards.
    let mut tx = app.pool.begin().await.unwrap();
    reindex::move_to(&mut *tx, ids[0], 4).await.unwrap();
    tx.commit().await.unwrap();
    let layout = app.layout(quiz_id).await;
    assert_eq!(texts(&layout), ["q2", "q3", "q4", "q1"]);
    assert_dense(&layout);
}
