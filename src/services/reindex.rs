// src/services/reindex.rs

//! Position reindexer.
//!
//! Keeps question positions of every quiz dense (`1..=N`) across insert, move
//! and delete. The store enforces uniqueness of `(quiz_id, position)` row by
//! row, so rows never shift in place: they are lifted into a band above the
//! quiz size and then lowered to their final position.
//!
//! All functions expect to run inside one store transaction; the caller owns
//! commit and rollback.

use async_trait::async_trait;

use crate::{error::AppError, models::question::QuestionDraft};

/// Minimum height of the temporary band.
pub const BAND_OFFSET: i32 = 1000;

/// Position held by a row while it is being moved or deleted.
pub const VACANT_POSITION: i32 = 0;

/// Row-level operations the reindexer needs from the store.
#[async_trait]
pub trait PositionStore: Send {
    /// Locks the quiz for the rest of the transaction. `NotFound` if absent.
    async fn lock_quiz(&mut self, quiz_id: i64) -> Result<(), AppError>;

    async fn question_count(&mut self, quiz_id: i64) -> Result<i32, AppError>;

    /// `(quiz_id, position)` of a question.
    async fn locate(&mut self, question_id: i64) -> Result<Option<(i64, i32)>, AppError>;

    async fn set_position(&mut self, question_id: i64, position: i32) -> Result<(), AppError>;

    /// Adds `offset` to every position of the quiz in `from..=to` (`to = None`
    /// means unbounded). Returns the number of rows touched.
    async fn offset_positions(
        &mut self,
        quiz_id: i64,
        from: i32,
        to: Option<i32>,
        offset: i32,
    ) -> Result<u64, AppError>;

    /// Writes the question row and its choices, in order. Returns the new id.
    async fn insert_question(
        &mut self,
        quiz_id: i64,
        position: i32,
        draft: &QuestionDraft,
    ) -> Result<i64, AppError>;

    async fn delete_question(&mut self, question_id: i64) -> Result<(), AppError>;
}

/// A contiguous range of positions shifted by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandShift {
    pub from: i32,
    pub to: Option<i32>,
    pub delta: i32,
}

impl BandShift {
    /// Rows at `position..` move down to make room.
    pub fn for_insert(position: i32, count: i32) -> Option<Self> {
        (position <= count).then_some(Self { from: position, to: None, delta: 1 })
    }

    /// Rows between the two positions close the gap left by the moved row.
    pub fn for_move(old: i32, new: i32) -> Option<Self> {
        match new.cmp(&old) {
            std::cmp::Ordering::Less => Some(Self { from: new, to: Some(old - 1), delta: 1 }),
            std::cmp::Ordering::Greater => Some(Self { from: old + 1, to: Some(new), delta: -1 }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Rows after the deleted one move up.
    pub fn for_delete(old: i32, count: i32) -> Option<Self> {
        (old < count).then_some(Self { from: old + 1, to: None, delta: -1 })
    }

    /// Band height that clears every live position of a quiz of `quiz_size`.
    pub fn band(&self, quiz_size: i32) -> i32 {
        BAND_OFFSET.max(quiz_size.saturating_add(1))
    }
}

/// Where an inserted question landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub question_id: i64,
    pub position: i32,
}

/// Resolves a requested insert position against a quiz of `count` questions.
/// Absent or zero appends. Negative is rejected.
pub fn insertion_point(requested: Option<i32>, count: i32) -> Result<i32, AppError> {
    match requested {
        None | Some(0) => Ok(count + 1),
        Some(p) if p < 0 => Err(AppError::BadRequest(format!("Invalid position: {p}"))),
        Some(p) => Ok(p.min(count + 1)),
    }
}

/// Clamps a move target into `1..=count`. Negative is rejected.
pub fn move_target(requested: i32, count: i32) -> Result<i32, AppError> {
    if requested < 0 {
        return Err(AppError::BadRequest(format!("Invalid position: {requested}")));
    }
    Ok(requested.clamp(1, count.max(1)))
}

/// Applies a shift through the temporary band so no two rows ever share a position.
pub async fn shift_band<S>(
    store: &mut S,
    quiz_id: i64,
    shift: BandShift,
    quiz_size: i32,
) -> Result<(), AppError>
where
    S: PositionStore + ?Sized,
{
    let band = shift.band(quiz_size);

    let lifted = store
        .offset_positions(quiz_id, shift.from, shift.to, band)
        .await?;
    if lifted == 0 {
        return Ok(());
    }

    store
        .offset_positions(
            quiz_id,
            shift.from + band,
            shift.to.map(|to| to + band),
            shift.delta - band,
        )
        .await?;

    tracing::debug!(
        "Shifted {} questions of quiz {} by {} (band {})",
        lifted,
        quiz_id,
        shift.delta,
        band
    );
    Ok(())
}

/// Locks the quiz that owns a question and returns `(quiz_id, position)` read
/// under that lock.
///
/// Any transaction that writes a question row must call this (or
/// [`PositionStore::lock_quiz`]) before its first write, so every writer of a
/// quiz takes the quiz lock before any question row lock.
pub async fn lock_question<S>(store: &mut S, question_id: i64) -> Result<(i64, i32), AppError>
where
    S: PositionStore + ?Sized,
{
    let (quiz_id, _) = store
        .locate(question_id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;
    store.lock_quiz(quiz_id).await?;

    // Re-read under the lock; a concurrent move may have run in between.
    let (_, position) = store
        .locate(question_id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;
    Ok((quiz_id, position))
}

/// Inserts a question at `requested` (clamped), shifting later questions down.
pub async fn insert_at<S>(
    store: &mut S,
    quiz_id: i64,
    draft: &QuestionDraft,
    requested: Option<i32>,
) -> Result<Placement, AppError>
where
    S: PositionStore + ?Sized,
{
    if let Some(p) = requested.filter(|p| *p < 0) {
        return Err(AppError::BadRequest(format!("Invalid position: {p}")));
    }

    store.lock_quiz(quiz_id).await?;
    let count = store.question_count(quiz_id).await?;
    let position = insertion_point(requested, count)?;

    if let Some(shift) = BandShift::for_insert(position, count) {
        shift_band(store, quiz_id, shift, count).await?;
    }

    let question_id = store.insert_question(quiz_id, position, draft).await?;
    tracing::info!(
        "Inserted question {} into quiz {} at position {}",
        question_id,
        quiz_id,
        position
    );

    Ok(Placement { question_id, position })
}

/// Moves a question to `target` (clamped). Returns the final position.
pub async fn move_to<S>(store: &mut S, question_id: i64, target: i32) -> Result<i32, AppError>
where
    S: PositionStore + ?Sized,
{
    if target < 0 {
        return Err(AppError::BadRequest(format!("Invalid position: {target}")));
    }

    let (quiz_id, old) = lock_question(store, question_id).await?;
    let count = store.question_count(quiz_id).await?;
    let new = move_target(target, count)?;

    let Some(shift) = BandShift::for_move(old, new) else {
        return Ok(old);
    };

    store.set_position(question_id, VACANT_POSITION).await?;
    shift_band(store, quiz_id, shift, count).await?;
    store.set_position(question_id, new).await?;

    tracing::info!(
        "Moved question {} of quiz {} from {} to {}",
        question_id,
        quiz_id,
        old,
        new
    );
    Ok(new)
}

/// Deletes a question and closes the gap it leaves.
pub async fn remove<S>(store: &mut S, question_id: i64) -> Result<(), AppError>
where
    S: PositionStore + ?Sized,
{
    let (quiz_id, old) = lock_question(store, question_id).await?;
    let count = store.question_count(quiz_id).await?;

    store.set_position(question_id, VACANT_POSITION).await?;
    if let Some(shift) = BandShift::for_delete(old, count) {
        shift_band(store, quiz_id, shift, count).await?;
    }
    store.delete_question(question_id).await?;

    tracing::info!("Deleted question {} at position {} of quiz {}", question_id, old, quiz_id);
    Ok(())
}
