//! Background job scheduler.
//!
//! Registers two recurring jobs: a daily one that queues a scrape job over
//! every active account, and a frequent runner tick that advances whatever
//! job is active until it completes.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use viralreels_core::AppConfig;
use viralreels_jobs::PgScrapeJobRunner;

const SCHEDULER_REQUESTER: &str = "scheduler";

/// Builds and starts the background job scheduler.
///
/// The returned handle must be kept alive for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if a cron expression is invalid, a job
/// cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    runner: Arc<PgScrapeJobRunner>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_daily_scrape_job(&scheduler, Arc::clone(&runner), &config.scrape_schedule).await?;
    register_runner_tick(&scheduler, runner, &config.runner_schedule).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_daily_scrape_job(
    scheduler: &JobScheduler,
    runner: Arc<PgScrapeJobRunner>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);

        Box::pin(async move {
            match runner.ensure_job(Some(SCHEDULER_REQUESTER), None).await {
                Ok(job) => tracing::info!(
                    job_id = %job.id,
                    status = %job.status,
                    accounts_total = job.accounts_total,
                    "scheduler: daily scrape job ensured"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: failed to ensure scrape job"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered daily scrape job");
    Ok(())
}

async fn register_runner_tick(
    scheduler: &JobScheduler,
    runner: Arc<PgScrapeJobRunner>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let guard = Arc::new(TickGuard::default());

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);
        let guard = Arc::clone(&guard);

        Box::pin(async move {
            let Some(_tick) = guard.try_enter() else {
                tracing::debug!("scheduler: previous runner tick still in progress; skipping");
                return;
            };
            run_tick(&runner).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered scrape runner tick");
    Ok(())
}

async fn run_tick(runner: &PgScrapeJobRunner) {
    let settings = runner.settings();
    match runner
        .run_active_job(settings.loop_budget, settings.max_loops)
        .await
    {
        Ok(outcome) if outcome.loops > 0 => tracing::info!(
            job_id = ?outcome.job.as_ref().map(|j| j.id),
            loops = outcome.loops,
            accounts_processed = outcome.accounts_processed,
            elapsed_ms = outcome.elapsed_ms,
            done = outcome.is_done(),
            "scheduler: scrape runner tick complete"
        ),
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "scheduler: scrape runner tick failed"),
    }
}

/// Keeps runner ticks from overlapping when one outlasts the cron interval.
#[derive(Debug, Default)]
struct TickGuard {
    busy: AtomicBool,
}

struct TickPermit<'a>(&'a TickGuard);

impl TickGuard {
    fn try_enter(&self) -> Option<TickPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickPermit(self))
    }
}

impl Drop for TickPermit<'_> {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
    }
}
