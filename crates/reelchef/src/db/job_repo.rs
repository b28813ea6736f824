//! Job repository: state transitions for the `extraction_jobs` table.
//!
//! Transitions are conditional updates on the current status. A `false`
//! return means another writer moved the job first and nothing changed.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::model::{ExtractionJob, JobStatus, Recipe};

use super::{recipe_repo, Database, DatabaseError};

const NON_TERMINAL: &str = "('pending', 'fetching_transcript', 'analyzing')";

/// Something that makes a new submission for the same user and video
/// redundant.
#[derive(Debug, Clone, PartialEq)]
pub enum Duplicate {
    /// Public id of the recipe the user already has.
    Recipe(String),
    /// The user's job for this video that is still running.
    ActiveJob(ExtractionJob),
}

/// Result of [`complete_with_recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    /// The job was no longer `analyzing`. Nothing was written.
    NotAnalyzing,
    /// The user already has a recipe for this video. Nothing was written.
    DuplicateRecipe,
}

fn from_row(row: &Row<'_>) -> Result<ExtractionJob, rusqlite::Error> {
    Ok(ExtractionJob {
        id: row.get("id")?,
        public_id: row.get("public_id")?,
        user_id: row.get("user_id")?,
        source_url: row.get("source_url")?,
        normalized_url: row.get("normalized_url")?,
        platform: row.get("platform")?,
        status: row.get("status")?,
        progress: row.get("progress")?,
        status_message: row.get("status_message")?,
        recipe_id: row.get("recipe_id")?,
        error: row.get("error")?,
        telegram_chat_id: row.get("telegram_chat_id")?,
        target_language: row.get("target_language")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn insert_with(conn: &Connection, job: &ExtractionJob) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO extraction_jobs (id, public_id, user_id, source_url, normalized_url,
         platform, status, progress, status_message, recipe_id, error, telegram_chat_id,
         target_language, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            job.id,
            job.public_id,
            job.user_id,
            job.source_url,
            job.normalized_url,
            job.platform,
            job.status,
            job.progress,
            job.status_message,
            job.recipe_id,
            job.error,
            job.telegram_chat_id,
            job.target_language,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Inserts a new job row. A second active job for the same user and video
/// violates a unique index.
pub fn insert(db: &Database, job: &ExtractionJob) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_with(conn, job))
}

fn duplicate_with(
    conn: &Connection,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<Duplicate>, DatabaseError> {
    if let Some(recipe) = recipe_repo::find_by_user_and_url_with(conn, user_id, normalized_url)? {
        return Ok(Some(Duplicate::Recipe(recipe.public_id)));
    }
    Ok(find_active_with(conn, user_id, normalized_url)?.map(Duplicate::ActiveJob))
}

/// Looks for an existing recipe, then a running job, for the user and URL.
pub fn find_duplicate(
    db: &Database,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<Duplicate>, DatabaseError> {
    db.with_conn(|conn| duplicate_with(conn, user_id, normalized_url))
}

/// Inserts `job` unless the user already has a recipe or an active job for
/// the same video. The check and the insert share one `IMMEDIATE`
/// transaction, so no other writer can slip in between.
pub fn insert_unless_duplicate(
    db: &Database,
    job: &ExtractionJob,
) -> Result<Option<Duplicate>, DatabaseError> {
    db.with_conn(|conn| {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        if let Some(duplicate) = duplicate_with(&tx, &job.user_id, &job.normalized_url)? {
            return Ok(Some(duplicate));
        }
        insert_with(&tx, job)?;
        tx.commit()?;
        Ok(None)
    })
}

/// Finds a job by the id handed out to clients.
pub fn find_by_public_id(
    db: &Database,
    public_id: &str,
) -> Result<Option<ExtractionJob>, DatabaseError> {
    db.with_conn(|conn| {
        let job = conn
            .query_row(
                "SELECT * FROM extraction_jobs WHERE public_id = ?1",
                params![public_id],
                from_row,
            )
            .optional()?;
        Ok(job)
    })
}

/// Finds the newest non-terminal job of a user for a normalized URL.
pub fn find_active_for_user_url(
    db: &Database,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<ExtractionJob>, DatabaseError> {
    db.with_conn(|conn| find_active_with(conn, user_id, normalized_url))
}

fn find_active_with(
    conn: &Connection,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<ExtractionJob>, DatabaseError> {
    let sql = format!(
        "SELECT * FROM extraction_jobs
         WHERE user_id = ?1 AND normalized_url = ?2 AND status IN {}
         ORDER BY created_at DESC LIMIT 1",
        NON_TERMINAL
    );
    let job = conn
        .query_row(&sql, params![user_id, normalized_url], from_row)
        .optional()?;
    Ok(job)
}

/// Claims a pending job for processing: `pending → fetching_transcript`.
///
/// Returns `false` when the job was not pending, which makes duplicate
/// triggers for the same job a no-op.
pub fn claim_pending(
    db: &Database,
    public_id: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    advance(
        db,
        public_id,
        JobStatus::Pending,
        JobStatus::FetchingTranscript,
        message,
        now,
    )
}

/// Moves a job from `from` to `to` if it is still in `from`.
///
/// Progress only ever grows: the stored value becomes
/// `MAX(progress, to.progress())`.
pub fn advance(
    db: &Database,
    public_id: &str,
    from: JobStatus,
    to: JobStatus,
    message: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    debug_assert!(from.can_transition_to(to));
    let progress = to.progress().unwrap_or(0);
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE extraction_jobs
             SET status = ?3, progress = MAX(progress, ?4), status_message = ?5, updated_at = ?6
             WHERE public_id = ?1 AND status = ?2",
            params![public_id, from, to, progress, message, now],
        )?;
        Ok(changed == 1)
    })
}

/// Marks a non-terminal job as failed. Progress is left as reached.
pub fn mark_failed(
    db: &Database,
    public_id: &str,
    error: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "UPDATE extraction_jobs
             SET status = 'failed', error = ?2, recipe_id = NULL,
                 status_message = 'Extraction failed', updated_at = ?3
             WHERE public_id = ?1 AND status IN {}",
            NON_TERMINAL
        );
        let changed = conn.execute(&sql, params![public_id, error, now])?;
        Ok(changed == 1)
    })
}

/// Persists the recipe and completes the job in one transaction.
///
/// Only an `analyzing` job can complete, and a user holds at most one
/// recipe per video. Either violation rolls everything back.
pub fn complete_with_recipe(
    db: &Database,
    public_id: &str,
    recipe: &Recipe,
    now: DateTime<Utc>,
) -> Result<Completion, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE extraction_jobs
             SET status = 'completed', progress = 100, recipe_id = ?2, error = NULL,
                 status_message = 'Recipe ready', updated_at = ?3
             WHERE public_id = ?1 AND status = 'analyzing'",
            params![public_id, recipe.public_id, now],
        )?;
        if changed != 1 {
            tx.rollback()?;
            return Ok(Completion::NotAnalyzing);
        }
        if !recipe_repo::insert_with(&tx, recipe)? {
            tx.rollback()?;
            return Ok(Completion::DuplicateRecipe);
        }
        tx.commit()?;
        Ok(Completion::Completed)
    })
}
