//! The resumable scrape-job state machine.
//!
//! One [`ScrapeJobRunner::process_batch`] call advances a job by at most one
//! slice of `batch_size` accounts and returns; a later call resumes from the
//! persisted cursor. Calls for the same job id are serialized by an in-process
//! mutex, and the cursor write is a compare-and-set so a second process
//! cannot apply the same slice twice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;
use viralreels_core::{AppConfig, JobStatus, ScrapeJob, TrackedAccount};
use viralreels_db::{DbError, ScrapeJobProgress};
use viralreels_scraper::{ReelScraper, ScrapeResult, ScrapeSource};

use crate::error::JobError;
use crate::store::JobStore;

/// Attempts `ensure_job` makes before giving up on a contended insert.
const ENSURE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub default_batch_size: i32,
    pub min_batch_size: i32,
    pub max_batch_size: i32,
    /// Accounts handed to the scraper in one combined call.
    pub accounts_per_call: usize,
    /// Wall-clock budget for one `process_batch` invocation.
    pub time_budget: Duration,
    /// Pause between scraper calls within a slice.
    pub inter_call_delay: Duration,
    pub loop_budget: Duration,
    pub max_loops: u32,
}

impl JobSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            default_batch_size: config.job_default_batch_size,
            min_batch_size: config.job_min_batch_size,
            max_batch_size: config.job_max_batch_size,
            accounts_per_call: config.scraper_accounts_per_call,
            time_budget: Duration::from_secs(config.job_time_budget_secs),
            inter_call_delay: Duration::from_millis(config.scraper_inter_call_delay_ms),
            loop_budget: Duration::from_secs(config.runner_loop_budget_secs),
            max_loops: config.runner_max_loops,
        }
    }

    /// Clamps a requested batch size to `[min, max]`, using the default when
    /// none was given.
    #[must_use]
    pub fn normalize_batch_size(&self, requested: Option<i32>) -> i32 {
        let min = self.min_batch_size.max(1);
        let max = self.max_batch_size.max(min);
        requested.unwrap_or(self.default_batch_size).clamp(min, max)
    }
}

/// Result of one `process_batch` call.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub job: ScrapeJob,
    /// Accounts attempted during this call.
    pub accounts_processed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobLookup {
    ById(Uuid),
    /// Most recently created job for a requester.
    LatestFor(String),
    /// Most recently created job overall.
    Latest,
}

/// Status snapshot returned to callers. A missing job is a state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatusView {
    NoJob,
    Found(ScrapeJob),
}

/// Result of one `run_active_job` call.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerOutcome {
    /// The job after the last processed batch, or `None` when nothing was active.
    pub job: Option<ScrapeJob>,
    pub loops: u32,
    pub accounts_processed: usize,
    pub elapsed_ms: u64,
}

impl RunnerOutcome {
    /// `true` when there is nothing left for a later runner tick to do.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.job.as_ref().is_none_or(ScrapeJob::is_terminal)
    }
}

/// Totals accumulated while walking one slice.
#[derive(Debug, Default)]
struct SliceTally {
    processed: usize,
    failed: usize,
    reels: usize,
    last_error: Option<String>,
}

pub struct ScrapeJobRunner<St, Src> {
    store: St,
    scraper: ReelScraper<Src>,
    settings: JobSettings,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<St: JobStore, Src: ScrapeSource> ScrapeJobRunner<St, Src> {
    pub fn new(store: St, scraper: ReelScraper<Src>, settings: JobSettings) -> Self {
        Self {
            store,
            scraper,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Returns the active job, creating one sized to the current active
    /// account list when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Store`] on storage failure, or
    /// [`JobError::Contention`] if concurrent creators kept winning the
    /// single-active-job race without the winner becoming visible.
    pub async fn ensure_job(
        &self,
        requested_by: Option<&str>,
        batch_size: Option<i32>,
    ) -> Result<ScrapeJob, JobError> {
        let batch_size = self.settings.normalize_batch_size(batch_size);

        for attempt in 1..=ENSURE_ATTEMPTS {
            if let Some(active) = self.store.find_active_job().await? {
                return Ok(active);
            }

            let accounts_total = to_i32(self.store.list_active_accounts().await?.len());
            match self
                .store
                .create_job(requested_by, batch_size, accounts_total)
                .await
            {
                Ok(job) => {
                    tracing::info!(
                        job_id = %job.id,
                        requested_by = requested_by.unwrap_or("-"),
                        batch_size,
                        accounts_total,
                        "scrape job created"
                    );
                    return Ok(job);
                }
                Err(DbError::Conflict(constraint)) => {
                    tracing::debug!(attempt, constraint, "lost scrape job creation race");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(JobError::Contention {
            attempts: ENSURE_ATTEMPTS,
        })
    }

    /// Advances `job_id` by at most one slice.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown id,
    /// [`JobError::ConcurrentUpdate`] if another writer moved the job first,
    /// or [`JobError::Store`] on storage failure. A failed write, or any
    /// storage failure while the slice is being scraped, also marks the job
    /// `failed`.
    pub async fn process_batch(&self, job_id: Uuid) -> Result<BatchProgress, JobError> {
        let lock = self.job_lock(job_id).await;
        let _guard = lock.lock().await;

        let result = self.process_locked(job_id).await;
        // Only a job that is still queued or running keeps its lock entry.
        let still_active = match &result {
            Ok(progress) => !progress.job.is_terminal(),
            Err(JobError::ConcurrentUpdate { .. } | JobError::InvalidTransition { .. }) => true,
            Err(_) => false,
        };
        if !still_active {
            self.release_lock(job_id).await;
        }
        result
    }

    async fn process_locked(&self, job_id: Uuid) -> Result<BatchProgress, JobError> {
        let started = Instant::now();

        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))?;

        if job.is_terminal() {
            return Ok(BatchProgress {
                job,
                accounts_processed: 0,
            });
        }

        self.advance(job, started).await
    }

    /// # Errors
    ///
    /// Returns [`JobError::Store`] if the lookup fails.
    pub async fn job_status(&self, lookup: JobLookup) -> Result<JobStatusView, JobError> {
        let job = match lookup {
            JobLookup::ById(id) => self.store.get_job(id).await?,
            JobLookup::LatestFor(requested_by) => self.store.latest_job_for(&requested_by).await?,
            JobLookup::Latest => self.store.latest_job().await?,
        };
        Ok(job.map_or(JobStatusView::NoJob, JobStatusView::Found))
    }

    /// Drives the active job until it is terminal, `loop_budget` is spent or
    /// `max_loops` batches have run.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Self::process_batch`].
    pub async fn run_active_job(
        &self,
        loop_budget: Duration,
        max_loops: u32,
    ) -> Result<RunnerOutcome, JobError> {
        let started = Instant::now();
        let Some(mut job) = self.store.find_active_job().await? else {
            tracing::debug!("no active scrape job");
            return Ok(RunnerOutcome {
                job: None,
                loops: 0,
                accounts_processed: 0,
                elapsed_ms: elapsed_ms(started),
            });
        };

        let mut loops = 0;
        let mut accounts_processed = 0;
        while started.elapsed() < loop_budget && loops < max_loops {
            let progress = self.process_batch(job.id).await?;
            job = progress.job;
            accounts_processed += progress.accounts_processed;
            loops += 1;
            if job.is_terminal() {
                break;
            }
        }

        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            loops,
            cursor = job.cursor,
            accounts_total = job.accounts_total,
            "scrape runner finished"
        );

        Ok(RunnerOutcome {
            job: Some(job),
            loops,
            accounts_processed,
            elapsed_ms: elapsed_ms(started),
        })
    }

    async fn advance(&self, job: ScrapeJob, started: Instant) -> Result<BatchProgress, JobError> {
        let accounts = self.store.list_active_accounts().await?;
        let total = to_i32(accounts.len());
        let start = job.cursor.clamp(0, total);
        let now = Utc::now();

        if total == 0 || start >= total {
            let completed = ScrapeJobProgress {
                status: JobStatus::Completed,
                cursor: start,
                accounts_total: total,
                accounts_processed: start,
                failed_accounts: job.failed_accounts,
                total_reels: job.total_reels,
                last_error: job.last_error.clone(),
                started_at: job.started_at.or(Some(now)),
                finished_at: Some(now),
            };
            let job = self.save(&job, &completed).await?;
            tracing::info!(job_id = %job.id, accounts_total = total, "scrape job completed");
            return Ok(BatchProgress {
                job,
                accounts_processed: 0,
            });
        }

        let started_at = job.started_at.or(Some(now));
        let job = if job.status == JobStatus::Running && job.accounts_total == total {
            job
        } else {
            let running = ScrapeJobProgress {
                status: JobStatus::Running,
                cursor: job.cursor,
                accounts_total: total,
                accounts_processed: job.accounts_processed,
                failed_accounts: job.failed_accounts,
                total_reels: job.total_reels,
                last_error: job.last_error.clone(),
                started_at,
                finished_at: None,
            };
            self.save(&job, &running).await?
        };

        let batch_size = usize::try_from(self.settings.normalize_batch_size(Some(job.batch_size)))
            .unwrap_or(1);
        let start_idx = usize::try_from(start).unwrap_or(0);
        let end_idx = (start_idx + batch_size).min(accounts.len());
        let slice = &accounts[start_idx..end_idx];

        tracing::info!(
            job_id = %job.id,
            cursor = start,
            slice = slice.len(),
            accounts_total = total,
            "processing scrape job slice"
        );

        let tally = match self.walk_slice(slice, started).await {
            Ok(tally) => tally,
            Err(e) => return Err(self.fail_job(job.id, e).await),
        };

        let cursor = (start + to_i32(tally.processed)).min(total);
        let done = cursor >= total;
        let finished = Utc::now();
        let progress = ScrapeJobProgress {
            status: if done {
                JobStatus::Completed
            } else {
                JobStatus::Running
            },
            cursor,
            accounts_total: total,
            accounts_processed: cursor,
            failed_accounts: job.failed_accounts + to_i32(tally.failed),
            total_reels: job.total_reels + to_i32(tally.reels),
            last_error: tally.last_error.or_else(|| job.last_error.clone()),
            started_at,
            finished_at: done.then_some(finished),
        };
        let job = self.save(&job, &progress).await?;

        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            cursor = job.cursor,
            processed = tally.processed,
            failed = tally.failed,
            reels = tally.reels,
            "scrape job slice persisted"
        );

        Ok(BatchProgress {
            job,
            accounts_processed: tally.processed,
        })
    }

    /// Scrapes the slice in chunks of `accounts_per_call`, persisting each
    /// chunk's results before the next call. The first chunk always runs so
    /// every invocation makes progress.
    async fn walk_slice(
        &self,
        slice: &[TrackedAccount],
        started: Instant,
    ) -> Result<SliceTally, DbError> {
        let today = Utc::now().date_naive();
        let account_ids: Vec<Uuid> = slice.iter().map(|a| a.id).collect();
        let history = self.store.view_history(&account_ids, today).await?;

        let mut tally = SliceTally::default();
        let per_call = self.settings.accounts_per_call.max(1);
        for (idx, chunk) in slice.chunks(per_call).enumerate() {
            if idx > 0 {
                if started.elapsed() >= self.settings.time_budget {
                    tracing::info!(
                        processed = tally.processed,
                        remaining = slice.len() - tally.processed,
                        "time budget spent, returning early"
                    );
                    break;
                }
                if !self.settings.inter_call_delay.is_zero() {
                    tokio::time::sleep(self.settings.inter_call_delay).await;
                }
            }

            let results = self.scraper.scrape_batch(chunk, &history).await;
            for result in &results {
                self.persist_result(result, today).await?;
                tally.reels += result.reels_filtered;
                if let Some(error) = &result.error {
                    tracing::warn!(account = %result.account.username, error, "account scrape failed");
                    tally.failed += 1;
                    tally.last_error = Some(error.clone());
                }
            }
            tally.processed += chunk.len();
        }
        Ok(tally)
    }

    async fn persist_result(
        &self,
        result: &ScrapeResult,
        today: NaiveDate,
    ) -> Result<(), DbError> {
        let account_id = result.account.id;
        if let Some(profile) = &result.profile {
            self.store.update_profile(account_id, profile).await?;
        }
        if !result.reels.is_empty() {
            let written = self
                .store
                .persist_reels(account_id, &result.reels, today)
                .await?;
            tracing::debug!(account = %result.account.username, written, "reels persisted");
        }
        Ok(())
    }

    async fn save(
        &self,
        job: &ScrapeJob,
        progress: &ScrapeJobProgress,
    ) -> Result<ScrapeJob, JobError> {
        if !job.status.can_transition_to(progress.status) {
            return Err(JobError::InvalidTransition {
                id: job.id,
                from: job.status,
                to: progress.status,
            });
        }
        match self.store.save_progress(job.id, job.cursor, progress).await {
            Ok(saved) => Ok(saved),
            Err(e) => Err(self.fail_job(job.id, e).await),
        }
    }

    /// Converts a storage error into a [`JobError`], marking the job `failed`
    /// unless the error means another writer got there first.
    async fn fail_job(&self, job_id: Uuid, err: DbError) -> JobError {
        match err {
            DbError::StaleCursor { .. } | DbError::InvalidJobTransition { .. } => {
                tracing::warn!(job_id = %job_id, error = %err, "scrape job updated concurrently");
                JobError::ConcurrentUpdate { id: job_id }
            }
            err => {
                tracing::error!(job_id = %job_id, error = %err, "scrape job persistence failed");
                if let Err(mark_err) = self.store.mark_failed(job_id, &err.to_string()).await {
                    tracing::warn!(job_id = %job_id, error = %mark_err, "could not mark scrape job failed");
                }
                JobError::Store(err)
            }
        }
    }

    async fn job_lock(&self, job_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(job_id).or_default())
    }

    async fn release_lock(&self, job_id: Uuid) {
        self.locks.lock().await.remove(&job_id);
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
