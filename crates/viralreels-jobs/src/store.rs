//! Persistence seam for the scrape-job state machine.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;
use viralreels_core::{NormalizedReel, ProfileUpdate, ScrapeJob, TrackedAccount};
use viralreels_db::{DbError, ScrapeJobProgress};
use viralreels_scraper::ViewHistory;

/// Storage operations the runner needs.
///
/// Implementations must enforce two invariants that the runner relies on:
/// at most one `queued`/`running` job exists at a time ([`create_job`]
/// returns [`DbError::Conflict`] otherwise), and [`save_progress`] only
/// applies when the stored cursor still equals `expected_cursor`.
///
/// [`create_job`]: JobStore::create_job
/// [`save_progress`]: JobStore::save_progress
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Active accounts in stable handle order.
    async fn list_active_accounts(&self) -> Result<Vec<TrackedAccount>, DbError>;

    /// Stored daily views for reels linked to `account_ids`, excluding
    /// snapshots on or after `before`.
    async fn view_history(
        &self,
        account_ids: &[Uuid],
        before: NaiveDate,
    ) -> Result<ViewHistory, DbError>;

    async fn create_job(
        &self,
        requested_by: Option<&str>,
        batch_size: i32,
        accounts_total: i32,
    ) -> Result<ScrapeJob, DbError>;

    /// Oldest active job, if any.
    async fn find_active_job(&self) -> Result<Option<ScrapeJob>, DbError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapeJob>, DbError>;

    async fn latest_job_for(&self, requested_by: &str) -> Result<Option<ScrapeJob>, DbError>;

    async fn latest_job(&self) -> Result<Option<ScrapeJob>, DbError>;

    async fn save_progress(
        &self,
        id: Uuid,
        expected_cursor: i32,
        progress: &ScrapeJobProgress,
    ) -> Result<ScrapeJob, DbError>;

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<ScrapeJob, DbError>;

    async fn update_profile(&self, account_id: Uuid, profile: &ProfileUpdate)
        -> Result<(), DbError>;

    /// Upserts reels, links them to the account and records the day's view
    /// snapshot. Returns the number of reels written.
    async fn persist_reels(
        &self,
        account_id: Uuid,
        reels: &[NormalizedReel],
        snapshot_date: NaiveDate,
    ) -> Result<usize, DbError>;
}
