//! Database operations for the `accounts` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use viralreels_core::{ProfileUpdate, TrackedAccount};

use crate::DbError;

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_pic_url: Option<String>,
    pub follower_count: Option<i64>,
    pub biography: Option<String>,
    pub active: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountRow> for TrackedAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            profile_pic_url: row.profile_pic_url,
            follower_count: row.follower_count,
            biography: row.biography,
            active: row.active,
            last_scraped_at: row.last_scraped_at,
            created_at: row.created_at,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, full_name, profile_pic_url, follower_count, \
                               biography, active, last_scraped_at, created_at, updated_at";

/// Returns every active account ordered by handle.
///
/// The order is stable across calls so a scrape job cursor always resumes at
/// the same next account.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_accounts(pool: &PgPool) -> Result<Vec<AccountRow>, DbError> {
    let rows = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts \
         WHERE active \
         ORDER BY LOWER(username) ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_account(pool: &PgPool, id: Uuid) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Writes freshly scraped profile fields onto an account.
///
/// Text fields the scrape did not observe keep their stored values.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no account has `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_account_profile(
    pool: &PgPool,
    id: Uuid,
    profile: &ProfileUpdate,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE accounts SET \
             full_name       = COALESCE($2, full_name), \
             profile_pic_url = COALESCE($3, profile_pic_url), \
             follower_count  = $4, \
             biography       = COALESCE($5, biography), \
             last_scraped_at = $6, \
             updated_at      = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(profile.full_name.as_deref())
    .bind(profile.profile_pic_url.as_deref())
    .bind(profile.follower_count)
    .bind(profile.biography.as_deref())
    .bind(profile.last_scraped_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
