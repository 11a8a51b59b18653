//! Database operations for `reels`, `reel_accounts` and `reel_view_snapshots`,
//! plus the feed read-model queries.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;
use viralreels_core::feed::LAST_24H_WINDOW_HOURS;
use viralreels_core::{FeedFilter, FeedSort, NormalizedReel};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `reels` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReelRow {
    pub id: Uuid,
    pub external_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub author_username: Option<String>,
    pub author_full_name: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Vec<String>,
    pub audio_track: Option<String>,
    pub audio_id: Option<String>,
    pub is_original_audio: bool,
    pub video_duration: Option<f64>,
    pub follower_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    pub viral_score: f64,
    pub viral_category: String,
    /// Serialized [`viralreels_core::ViralityMetrics`].
    pub metrics: Value,
    pub is_rising_star: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One licensed audio track aggregated across reels.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendingAudioRow {
    pub audio_track: String,
    pub audio_id: Option<String>,
    pub reel_count: i64,
    pub total_views: i64,
    pub top_viral_score: f64,
}

/// Feed listing parameters.
#[derive(Debug, Clone)]
pub struct ReelFeedQuery<'a> {
    pub filter: FeedFilter,
    pub sort: FeedSort,
    pub account_id: Option<Uuid>,
    /// Case-insensitive substring match on the caption.
    pub search: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
    /// Reference time for the `last24h` window.
    pub now: DateTime<Utc>,
}

const REEL_COLUMNS: &str = "r.id, r.external_id, r.url, r.thumbnail_url, r.video_url, \
     r.view_count, r.like_count, r.comment_count, r.share_count, \
     r.author_username, r.author_full_name, r.caption, r.hashtags, \
     r.audio_track, r.audio_id, r.is_original_audio, r.video_duration, \
     r.follower_count, r.posted_at, r.viral_score, r.viral_category, \
     r.metrics, r.is_rising_star, r.created_at, r.updated_at";

// Parameters: $1 posted-after cutoff, $2 rising-stars only, $3 licensed audio
// only, $4 account id, $5 search pattern.
const FEED_WHERE: &str = "WHERE ($1::TIMESTAMPTZ IS NULL OR r.posted_at >= $1) \
       AND (NOT $2 OR r.is_rising_star) \
       AND (NOT $3 OR (r.audio_track IS NOT NULL AND NOT r.is_original_audio)) \
       AND ($4::UUID IS NULL OR EXISTS ( \
               SELECT 1 FROM reel_accounts ra \
               WHERE ra.reel_id = r.id AND ra.account_id = $4)) \
       AND ($5::TEXT IS NULL OR r.caption ILIKE $5)";

fn sort_column(sort: FeedSort) -> &'static str {
    match sort {
        FeedSort::Virality => "r.viral_score",
        FeedSort::Views => "r.view_count",
        FeedSort::Shares => "r.share_count",
        FeedSort::Comments => "r.comment_count",
    }
}

/// Escapes `LIKE` metacharacters and wraps the term in `%…%`.
fn search_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

struct FeedBinds {
    posted_after: Option<DateTime<Utc>>,
    rising_only: bool,
    audio_only: bool,
    account_id: Option<Uuid>,
    search: Option<String>,
}

impl FeedBinds {
    fn new(query: &ReelFeedQuery<'_>) -> Self {
        Self {
            posted_after: (query.filter == FeedFilter::Last24h)
                .then(|| query.now - Duration::hours(LAST_24H_WINDOW_HOURS)),
            rising_only: query.filter == FeedFilter::RisingStars,
            audio_only: query.filter == FeedFilter::AudioTrending,
            account_id: query.account_id,
            search: query
                .search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(search_pattern),
        }
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a reel or refreshes the existing row with the same `external_id`.
///
/// Returns the reel's internal id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_reel<'e, E: PgExecutor<'e>>(
    executor: E,
    reel: &NormalizedReel,
) -> Result<Uuid, DbError> {
    let metrics = serde_json::to_value(reel.metrics).unwrap_or(Value::Null);
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO reels ( \
             external_id, url, thumbnail_url, video_url, \
             view_count, like_count, comment_count, share_count, \
             author_username, author_full_name, caption, hashtags, \
             audio_track, audio_id, is_original_audio, video_duration, \
             follower_count, posted_at, viral_score, viral_category, \
             metrics, is_rising_star) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                 $13, $14, $15, $16, $17, $18, $19, $20, $21, $22) \
         ON CONFLICT (external_id) DO UPDATE SET \
             url               = EXCLUDED.url, \
             thumbnail_url     = EXCLUDED.thumbnail_url, \
             video_url         = EXCLUDED.video_url, \
             view_count        = EXCLUDED.view_count, \
             like_count        = EXCLUDED.like_count, \
             comment_count     = EXCLUDED.comment_count, \
             share_count       = EXCLUDED.share_count, \
             author_username   = EXCLUDED.author_username, \
             author_full_name  = EXCLUDED.author_full_name, \
             caption           = EXCLUDED.caption, \
             hashtags          = EXCLUDED.hashtags, \
             audio_track       = EXCLUDED.audio_track, \
             audio_id          = EXCLUDED.audio_id, \
             is_original_audio = EXCLUDED.is_original_audio, \
             video_duration    = EXCLUDED.video_duration, \
             follower_count    = EXCLUDED.follower_count, \
             posted_at         = COALESCE(EXCLUDED.posted_at, reels.posted_at), \
             viral_score       = EXCLUDED.viral_score, \
             viral_category    = EXCLUDED.viral_category, \
             metrics           = EXCLUDED.metrics, \
             is_rising_star    = EXCLUDED.is_rising_star, \
             updated_at        = NOW() \
         RETURNING id",
    )
    .bind(&reel.external_id)
    .bind(&reel.url)
    .bind(reel.thumbnail_url.as_deref())
    .bind(reel.video_url.as_deref())
    .bind(reel.view_count)
    .bind(reel.like_count)
    .bind(reel.comment_count)
    .bind(reel.share_count)
    .bind(reel.author_username.as_deref())
    .bind(reel.author_full_name.as_deref())
    .bind(reel.caption.as_deref())
    .bind(&reel.hashtags)
    .bind(reel.audio_track.as_deref())
    .bind(reel.audio_id.as_deref())
    .bind(reel.is_original_audio)
    .bind(reel.video_duration)
    .bind(reel.follower_count)
    .bind(reel.posted_at)
    .bind(reel.viral_score)
    .bind(reel.viral_category.as_str())
    .bind(metrics)
    .bind(reel.is_rising_star)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Links a reel to the account it was scraped from. Idempotent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn link_reel_to_account<'e, E: PgExecutor<'e>>(
    executor: E,
    reel_id: Uuid,
    account_id: Uuid,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO reel_accounts (reel_id, account_id) VALUES ($1, $2) \
         ON CONFLICT (reel_id, account_id) DO NOTHING",
    )
    .bind(reel_id)
    .bind(account_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Records the view count observed for a reel on `snapshot_date`.
///
/// A later observation on the same day replaces the earlier one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_view_snapshot<'e, E: PgExecutor<'e>>(
    executor: E,
    reel_id: Uuid,
    snapshot_date: NaiveDate,
    view_count: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO reel_view_snapshots (reel_id, snapshot_date, view_count) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (reel_id, snapshot_date) DO UPDATE SET \
             view_count  = EXCLUDED.view_count, \
             captured_at = NOW()",
    )
    .bind(reel_id)
    .bind(snapshot_date)
    .bind(view_count)
    .execute(executor)
    .await?;
    Ok(())
}

/// Upserts an account's scraped reels, links them to the account and records
/// today's view snapshot for each, all in one transaction.
///
/// Returns the number of reels written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed.
pub async fn persist_account_reels(
    pool: &PgPool,
    account_id: Uuid,
    reels: &[NormalizedReel],
    snapshot_date: NaiveDate,
) -> Result<usize, DbError> {
    if reels.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for reel in reels {
        let reel_id = upsert_reel(&mut *tx, reel).await?;
        link_reel_to_account(&mut *tx, reel_id, account_id).await?;
        record_view_snapshot(&mut *tx, reel_id, snapshot_date, reel.view_count).await?;
    }
    tx.commit().await?;

    Ok(reels.len())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Daily view counts for every reel linked to `account_ids`, keyed by
/// `external_id`, oldest first. Snapshots on or after `before` are excluded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn view_history_for_accounts(
    pool: &PgPool,
    account_ids: &[Uuid],
    before: NaiveDate,
) -> Result<HashMap<String, Vec<i64>>, DbError> {
    if account_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT r.external_id, s.view_count \
         FROM reel_view_snapshots s \
         JOIN reels r ON r.id = s.reel_id \
         WHERE s.snapshot_date < $2 \
           AND EXISTS ( \
               SELECT 1 FROM reel_accounts ra \
               WHERE ra.reel_id = r.id AND ra.account_id = ANY($1)) \
         ORDER BY r.external_id, s.snapshot_date ASC",
    )
    .bind(account_ids)
    .bind(before)
    .fetch_all(pool)
    .await?;

    let mut history: HashMap<String, Vec<i64>> = HashMap::new();
    for (external_id, views) in rows {
        history.entry(external_id).or_default().push(views);
    }
    Ok(history)
}

/// Returns one page of the ranked feed.
///
/// Ties on the sort column break on `posted_at` descending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reels(
    pool: &PgPool,
    query: &ReelFeedQuery<'_>,
) -> Result<Vec<ReelRow>, DbError> {
    let binds = FeedBinds::new(query);
    let sql = format!(
        "SELECT {REEL_COLUMNS} FROM reels r {FEED_WHERE} \
         ORDER BY {} DESC, r.posted_at DESC NULLS LAST, r.id \
         LIMIT $6 OFFSET $7",
        sort_column(query.sort)
    );

    let rows = sqlx::query_as::<_, ReelRow>(&sql)
        .bind(binds.posted_after)
        .bind(binds.rising_only)
        .bind(binds.audio_only)
        .bind(binds.account_id)
        .bind(binds.search)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Total rows matching the feed filters, ignoring paging.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_reels(pool: &PgPool, query: &ReelFeedQuery<'_>) -> Result<i64, DbError> {
    let binds = FeedBinds::new(query);
    let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM reels r {FEED_WHERE}"))
        .bind(binds.posted_after)
        .bind(binds.rising_only)
        .bind(binds.audio_only)
        .bind(binds.account_id)
        .bind(binds.search)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_reel(pool: &PgPool, id: Uuid) -> Result<Option<ReelRow>, DbError> {
    let row = sqlx::query_as::<_, ReelRow>(&format!(
        "SELECT {REEL_COLUMNS} FROM reels r WHERE r.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Most-used licensed audio tracks, ranked by reel count then best score.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn trending_audio(pool: &PgPool, limit: i64) -> Result<Vec<TrendingAudioRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendingAudioRow>(
        "SELECT audio_track, \
                MAX(audio_id) AS audio_id, \
                COUNT(*) AS reel_count, \
                COALESCE(SUM(view_count), 0)::BIGINT AS total_views, \
                MAX(viral_score) AS top_viral_score \
         FROM reels \
         WHERE audio_track IS NOT NULL AND NOT is_original_audio \
         GROUP BY audio_track \
         ORDER BY reel_count DESC, top_viral_score DESC, audio_track ASC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
