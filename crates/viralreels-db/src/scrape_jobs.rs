//! Database operations for `scrape_jobs`.
//!
//! A partial unique index allows at most one `queued`/`running` row, so a
//! racing second insert surfaces as [`DbError::Conflict`]. Progress writes
//! compare-and-set on `cursor`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use viralreels_core::{JobStatus, ScrapeJob};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `scrape_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeJobRow {
    pub id: Uuid,
    pub requested_by: Option<String>,
    pub status: String,
    pub cursor: i32,
    pub batch_size: i32,
    pub accounts_total: i32,
    pub accounts_processed: i32,
    pub failed_accounts: i32,
    pub total_reels: i32,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ScrapeJobRow> for ScrapeJob {
    type Error = DbError;

    fn try_from(row: ScrapeJobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|e| DbError::InvalidColumn {
                column: "scrape_jobs.status",
                value: e.0,
            })?;
        Ok(Self {
            id: row.id,
            requested_by: row.requested_by,
            status,
            cursor: row.cursor,
            batch_size: row.batch_size,
            accounts_total: row.accounts_total,
            accounts_processed: row.accounts_processed,
            failed_accounts: row.failed_accounts,
            total_reels: row.total_reels,
            last_error: row.last_error,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Mutable fields written after each processed slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeJobProgress {
    pub status: JobStatus,
    pub cursor: i32,
    pub accounts_total: i32,
    pub accounts_processed: i32,
    pub failed_accounts: i32,
    pub total_reels: i32,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

const JOB_COLUMNS: &str = "id, requested_by, status, cursor, batch_size, accounts_total, \
                           accounts_processed, failed_accounts, total_reels, last_error, \
                           started_at, finished_at, created_at, updated_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a new `queued` job.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if another active job already exists, or
/// [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn create_scrape_job(
    pool: &PgPool,
    requested_by: Option<&str>,
    batch_size: i32,
    accounts_total: i32,
) -> Result<ScrapeJobRow, DbError> {
    let id = Uuid::new_v4();

    sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "INSERT INTO scrape_jobs (id, requested_by, status, batch_size, accounts_total) \
         VALUES ($1, $2, 'queued', $3, $4) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(id)
    .bind(requested_by)
    .bind(batch_size)
    .bind(accounts_total)
    .fetch_one(pool)
    .await
    .map_err(DbError::from_write)
}

/// Writes slice progress if the stored cursor still equals `expected_cursor`
/// and the job is not terminal.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the job does not exist,
/// [`DbError::InvalidJobTransition`] if it is already terminal,
/// [`DbError::StaleCursor`] if another writer advanced it first, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn save_scrape_job_progress(
    pool: &PgPool,
    id: Uuid,
    expected_cursor: i32,
    progress: &ScrapeJobProgress,
) -> Result<ScrapeJobRow, DbError> {
    let row = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "UPDATE scrape_jobs SET \
             status             = $3, \
             cursor             = $4, \
             accounts_total     = $5, \
             accounts_processed = $6, \
             failed_accounts    = $7, \
             total_reels        = $8, \
             last_error         = $9, \
             started_at         = $10, \
             finished_at        = $11, \
             updated_at         = NOW() \
         WHERE id = $1 AND cursor = $2 AND status IN ('queued', 'running') \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(id)
    .bind(expected_cursor)
    .bind(progress.status.as_str())
    .bind(progress.cursor)
    .bind(progress.accounts_total)
    .bind(progress.accounts_processed)
    .bind(progress.failed_accounts)
    .bind(progress.total_reels)
    .bind(progress.last_error.as_deref())
    .bind(progress.started_at)
    .bind(progress.finished_at)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = row {
        return Ok(row);
    }

    match get_scrape_job(pool, id).await? {
        None => Err(DbError::NotFound),
        Some(current) if current.status == "completed" || current.status == "failed" => {
            Err(DbError::InvalidJobTransition {
                id,
                expected_status: "queued or running",
            })
        }
        Some(_) => Err(DbError::StaleCursor {
            id,
            expected_cursor,
        }),
    }
}

/// Marks an active job `failed`, recording `error` and `finished_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is missing or already
/// terminal, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_scrape_job(
    pool: &PgPool,
    id: Uuid,
    error: &str,
) -> Result<ScrapeJobRow, DbError> {
    let row = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "UPDATE scrape_jobs SET \
             status      = 'failed', \
             last_error  = $2, \
             finished_at = NOW(), \
             updated_at  = NOW() \
         WHERE id = $1 AND status IN ('queued', 'running') \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(id)
    .bind(error)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::InvalidJobTransition {
        id,
        expected_status: "queued or running",
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_scrape_job(pool: &PgPool, id: Uuid) -> Result<Option<ScrapeJobRow>, DbError> {
    let row = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM scrape_jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns the oldest `queued` or `running` job, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_active_scrape_job(pool: &PgPool) -> Result<Option<ScrapeJobRow>, DbError> {
    let row = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM scrape_jobs \
         WHERE status IN ('queued', 'running') \
         ORDER BY created_at ASC \
         LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns the most recently created job for `requested_by`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_scrape_job_for(
    pool: &PgPool,
    requested_by: &str,
) -> Result<Option<ScrapeJobRow>, DbError> {
    let row = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM scrape_jobs \
         WHERE requested_by = $1 \
         ORDER BY created_at DESC \
         LIMIT 1"
    ))
    .bind(requested_by)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Returns the most recently created job regardless of requester.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_scrape_job(pool: &PgPool) -> Result<Option<ScrapeJobRow>, DbError> {
    let row = sqlx::query_as::<_, ScrapeJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM scrape_jobs ORDER BY created_at DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
