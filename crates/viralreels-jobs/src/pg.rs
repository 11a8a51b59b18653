use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;
use viralreels_core::{AppConfig, NormalizedReel, ProfileUpdate, ScrapeJob, TrackedAccount};
use viralreels_db::{DbError, ScrapeJobProgress, ScrapeJobRow};
use viralreels_scraper::{
    ApifyClient, ApifyClientConfig, ReelScraper, ScraperError, ScraperSettings, ViewHistory,
};

use crate::engine::{JobSettings, ScrapeJobRunner};
use crate::store::JobStore;

/// The production runner: Postgres storage, Apify as the scrape source.
pub type PgScrapeJobRunner = ScrapeJobRunner<PgJobStore, ApifyClient>;

impl PgScrapeJobRunner {
    /// Wires a runner from application config.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the Apify HTTP client cannot be built.
    pub fn from_app_config(pool: PgPool, config: &AppConfig) -> Result<Self, ScraperError> {
        let client = ApifyClient::new(ApifyClientConfig::from_app_config(config))?;
        let scraper = ReelScraper::new(client, ScraperSettings::from_app_config(config));
        Ok(Self::new(
            PgJobStore::new(pool),
            scraper,
            JobSettings::from_app_config(config),
        ))
    }
}

/// [`JobStore`] backed by the Postgres tables in `viralreels-db`.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_job(row: Option<ScrapeJobRow>) -> Result<Option<ScrapeJob>, DbError> {
    row.map(ScrapeJob::try_from).transpose()
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn list_active_accounts(&self) -> Result<Vec<TrackedAccount>, DbError> {
        let rows = viralreels_db::list_active_accounts(&self.pool).await?;
        Ok(rows.into_iter().map(TrackedAccount::from).collect())
    }

    async fn view_history(
        &self,
        account_ids: &[Uuid],
        before: NaiveDate,
    ) -> Result<ViewHistory, DbError> {
        viralreels_db::view_history_for_accounts(&self.pool, account_ids, before).await
    }

    async fn create_job(
        &self,
        requested_by: Option<&str>,
        batch_size: i32,
        accounts_total: i32,
    ) -> Result<ScrapeJob, DbError> {
        let row =
            viralreels_db::create_scrape_job(&self.pool, requested_by, batch_size, accounts_total)
                .await?;
        ScrapeJob::try_from(row)
    }

    async fn find_active_job(&self) -> Result<Option<ScrapeJob>, DbError> {
        to_job(viralreels_db::find_active_scrape_job(&self.pool).await?)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapeJob>, DbError> {
        to_job(viralreels_db::get_scrape_job(&self.pool, id).await?)
    }

    async fn latest_job_for(&self, requested_by: &str) -> Result<Option<ScrapeJob>, DbError> {
        to_job(viralreels_db::latest_scrape_job_for(&self.pool, requested_by).await?)
    }

    async fn latest_job(&self) -> Result<Option<ScrapeJob>, DbError> {
        to_job(viralreels_db::latest_scrape_job(&self.pool).await?)
    }

    async fn save_progress(
        &self,
        id: Uuid,
        expected_cursor: i32,
        progress: &ScrapeJobProgress,
    ) -> Result<ScrapeJob, DbError> {
        let row =
            viralreels_db::save_scrape_job_progress(&self.pool, id, expected_cursor, progress)
                .await?;
        ScrapeJob::try_from(row)
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<ScrapeJob, DbError> {
        let row = viralreels_db::fail_scrape_job(&self.pool, id, error).await?;
        ScrapeJob::try_from(row)
    }

    async fn update_profile(
        &self,
        account_id: Uuid,
        profile: &ProfileUpdate,
    ) -> Result<(), DbError> {
        viralreels_db::update_account_profile(&self.pool, account_id, profile).await
    }

    async fn persist_reels(
        &self,
        account_id: Uuid,
        reels: &[NormalizedReel],
        snapshot_date: NaiveDate,
    ) -> Result<usize, DbError> {
        viralreels_db::persist_account_reels(&self.pool, account_id, reels, snapshot_date).await
    }
}
