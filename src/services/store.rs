// src/services/store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        question::{Choice, ChoiceDraft, Question, QuestionDraft, QuestionResponse},
        quiz::DEFAULT_QUIZZES,
    },
    services::{
        reindex::PositionStore,
        scoring::{AnswerKey, KeyChoice, KeyQuestion, ScoredAttempt},
    },
};

#[async_trait]
impl PositionStore for PgConnection {
    async fn lock_quiz(&mut self, quiz_id: i64) -> Result<(), AppError> {
        // Serializes every reindex of the same quiz until commit.
        sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .fetch_optional(&mut *self)
            .await?
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
        Ok(())
    }

    async fn question_count(&mut self, quiz_id: i64) -> Result<i32, AppError> {
        let count = sqlx::query_scalar::<_, i32>(
            "SELECT COUNT(*)::INT4 FROM questions WHERE quiz_id = $1",
        )
        .bind(quiz_id)
        .fetch_one(&mut *self)
        .await?;
        Ok(count)
    }

    async fn locate(&mut self, question_id: i64) -> Result<Option<(i64, i32)>, AppError> {
        let row = sqlx::query_as::<_, (i64, i32)>(
            "SELECT quiz_id, position FROM questions WHERE id = $1",
        )
        .bind(question_id)
        .fetch_optional(&mut *self)
        .await?;
        Ok(row)
    }

    async fn set_position(&mut self, question_id: i64, position: i32) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE questions SET position = $1 WHERE id = $2")
            .bind(position)
            .bind(question_id)
            .execute(&mut *self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }

    async fn offset_positions(
        &mut self,
        quiz_id: i64,
        from: i32,
        to: Option<i32>,
        offset: i32,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET position = position + $1
            WHERE quiz_id = $2
              AND position >= $3
              AND ($4::INT4 IS NULL OR position <= $4)
            "#,
        )
        .bind(offset)
        .bind(quiz_id)
        .bind(from)
        .bind(to)
        .execute(&mut *self)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_question(
        &mut self,
        quiz_id: i64,
        position: i32,
        draft: &QuestionDraft,
    ) -> Result<i64, AppError> {
        let question_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions
            (quiz_id, position, title, text, image, difficulty, tags, explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(position)
        .bind(&draft.title)
        .bind(&draft.text)
        .bind(&draft.image)
        .bind(draft.difficulty)
        .bind(Json(&draft.tags))
        .bind(&draft.explanation)
        .fetch_one(&mut *self)
        .await?;

        insert_choices(self, question_id, &draft.choices).await?;

        Ok(question_id)
    }

    async fn delete_question(&mut self, question_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&mut *self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }
}

/// Attaches choices in slice order, so id order is attachment order.
pub async fn insert_choices(
    conn: &mut PgConnection,
    question_id: i64,
    choices: &[ChoiceDraft],
) -> Result<(), AppError> {
    if choices.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO choices (question_id, text, is_correct) ");
    builder.push_values(choices, |mut row, choice| {
        row.push_bind(question_id)
            .push_bind(choice.text.clone())
            .push_bind(choice.is_correct);
    });

    builder.build().execute(&mut *conn).await?;
    Ok(())
}

/// Rewrites the choice set of a question slot by slot.
///
/// Existing choices keep their ids, so answers of past attempts stay attached.
/// Surplus choices are dropped only when no stored answer references them;
/// otherwise the update is refused with `Conflict`.
pub async fn replace_choices(
    conn: &mut PgConnection,
    question_id: i64,
    choices: &[ChoiceDraft],
) -> Result<(), AppError> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM choices WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&mut *conn)
    .await?;

    let kept = existing.len().min(choices.len());
    let surplus = &existing[kept..];

    if !surplus.is_empty() {
        let referenced = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM answers WHERE choice_id = ANY($1)",
        )
        .bind(surplus)
        .fetch_one(&mut *conn)
        .await?;

        if referenced > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot remove choices of question {question_id}: {referenced} stored answers reference them"
            )));
        }

        sqlx::query("DELETE FROM choices WHERE id = ANY($1)")
            .bind(surplus)
            .execute(&mut *conn)
            .await?;
    }

    for (choice_id, choice) in existing.iter().zip(choices) {
        sqlx::query("UPDATE choices SET text = $1, is_correct = $2 WHERE id = $3")
            .bind(&choice.text)
            .bind(choice.is_correct)
            .bind(choice_id)
            .execute(&mut *conn)
            .await?;
    }

    insert_choices(conn, question_id, &choices[kept..]).await
}

/// Choices of the given questions, grouped by question, in attachment order.
pub async fn choices_for(
    conn: &mut PgConnection,
    question_ids: &[i64],
) -> Result<HashMap<i64, Vec<Choice>>, AppError> {
    if question_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT id, question_id, text, is_correct
        FROM choices
        WHERE question_id = ANY($1)
        ORDER BY question_id, id
        "#,
    )
    .bind(question_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<i64, Vec<Choice>> = HashMap::new();
    for choice in choices {
        grouped.entry(choice.question_id).or_default().push(choice);
    }
    Ok(grouped)
}

/// Attaches choices to questions and builds the client views.
pub async fn with_choices(
    conn: &mut PgConnection,
    questions: Vec<Question>,
    reveal: bool,
) -> Result<Vec<QuestionResponse>, AppError> {
    let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let mut grouped = choices_for(conn, &ids).await?;

    Ok(questions
        .into_iter()
        .map(|q| {
            let choices = grouped.remove(&q.id).unwrap_or_default();
            QuestionResponse::from_parts(q, choices, reveal)
        })
        .collect())
}

/// Snapshot of a quiz's questions and choices for scoring.
pub async fn load_answer_key(conn: &mut PgConnection, quiz_id: i64) -> Result<AnswerKey, AppError> {
    let questions = sqlx::query_as::<_, (i64, i32)>(
        "SELECT id, position FROM questions WHERE quiz_id = $1 ORDER BY position",
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    let ids: Vec<i64> = questions.iter().map(|(id, _)| *id).collect();
    let mut grouped = choices_for(conn, &ids).await?;

    Ok(AnswerKey::new(
        questions
            .into_iter()
            .map(|(id, position)| KeyQuestion {
                id,
                position,
                choices: grouped
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| KeyChoice {
                        id: c.id,
                        is_correct: c.is_correct,
                    })
                    .collect(),
            })
            .collect(),
    ))
}

/// Writes a scored attempt and its answers. Returns the attempt id.
pub async fn persist_attempt(
    conn: &mut PgConnection,
    attempt: &ScoredAttempt,
) -> Result<i64, AppError> {
    let attempt_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO attempts (quiz_id, player_name, score, total_questions, time_spent)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(attempt.quiz_id)
    .bind(&attempt.player_name)
    .bind(attempt.score)
    .bind(attempt.total_questions)
    .bind(attempt.time_spent)
    .fetch_one(&mut *conn)
    .await?;

    if !attempt.answers.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO answers (attempt_id, question_id, choice_id, is_correct) ",
        );
        builder.push_values(&attempt.answers, |mut row, answer| {
            row.push_bind(attempt_id)
                .push_bind(answer.question_id)
                .push_bind(answer.choice_id)
                .push_bind(answer.is_correct);
        });
        builder.build().execute(&mut *conn).await?;
    }

    Ok(attempt_id)
}

/// Inserts the default quizzes that are missing and keeps the id sequence
/// above them.
pub async fn seed_default_quizzes(conn: &mut PgConnection) -> Result<u64, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO quizzes (id, title, description, difficulty) ");
    builder.push_values(DEFAULT_QUIZZES, |mut row, quiz| {
        row.push_bind(quiz.id)
            .push_bind(quiz.title)
            .push_bind(quiz.description)
            .push_bind(quiz.difficulty);
    });
    builder.push(" ON CONFLICT (id) DO NOTHING");
    let inserted = builder.build().execute(&mut *conn).await?.rows_affected();

    sqlx::query(
        r#"
        SELECT setval(
            'quizzes_id_seq',
            GREATEST((SELECT COALESCE(MAX(id), 0) FROM quizzes), (SELECT last_value FROM quizzes_id_seq))
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(inserted)
}

/// Empties every table, restarts the id sequences and seeds the default quizzes.
pub async fn rebuild_schema(conn: &mut PgConnection) -> Result<(), AppError> {
    sqlx::query("TRUNCATE answers, attempts, choices, questions, quizzes RESTART IDENTITY")
        .execute(&mut *conn)
        .await?;
    seed_default_quizzes(conn).await?;
    Ok(())
}
