//! `jobs` command handlers.
//!
//! All of these drive the same runner the server uses, so a job started from
//! the CLI can be advanced by the scheduler and vice versa.

use clap::Subcommand;
use uuid::Uuid;
use viralreels_core::{AppConfig, ScrapeJob};
use viralreels_jobs::{JobLookup, JobStatusView, PgScrapeJobRunner};

const CLI_REQUESTER: &str = "cli";

#[derive(Debug, Subcommand)]
pub enum JobsCommands {
    /// Return the active scrape job, creating one if none is queued or running
    Ensure {
        /// Accounts per batch (clamped to the configured bounds)
        #[arg(long)]
        batch_size: Option<i32>,

        /// Label recorded on a newly created job
        #[arg(long, default_value = CLI_REQUESTER)]
        requested_by: String,
    },
    /// Advance a job by one batch of accounts
    Process { job_id: Uuid },
    /// Drive the active job until it completes or the loop budget runs out
    Run {
        /// Override the configured maximum number of batches
        #[arg(long)]
        max_loops: Option<u32>,
    },
    /// Show a job by id, the latest job for a requester, or the latest job overall
    Status {
        #[arg(long, conflicts_with = "requested_by")]
        id: Option<Uuid>,

        #[arg(long)]
        requested_by: Option<String>,
    },
}

/// # Errors
///
/// Returns an error if the runner cannot be built or the job operation fails.
pub(crate) async fn run(
    pool: sqlx::PgPool,
    config: &AppConfig,
    command: JobsCommands,
) -> anyhow::Result<()> {
    let runner = PgScrapeJobRunner::from_app_config(pool, config)?;

    match command {
        JobsCommands::Ensure {
            batch_size,
            requested_by,
        } => {
            let job = runner.ensure_job(Some(&requested_by), batch_size).await?;
            print_job(&job);
        }
        JobsCommands::Process { job_id } => {
            let progress = runner.process_batch(job_id).await?;
            println!(
                "processed {} account(s) this batch",
                progress.accounts_processed
            );
            print_job(&progress.job);
        }
        JobsCommands::Run { max_loops } => {
            let settings = runner.settings();
            let outcome = runner
                .run_active_job(
                    settings.loop_budget,
                    max_loops.unwrap_or(settings.max_loops),
                )
                .await?;
            match &outcome.job {
                None => println!("no active scrape job"),
                Some(job) => {
                    println!(
                        "ran {} batch(es), {} account(s) in {} ms",
                        outcome.loops, outcome.accounts_processed, outcome.elapsed_ms
                    );
                    print_job(job);
                    if !outcome.is_done() {
                        println!("job still active; run again to continue");
                    }
                }
            }
        }
        JobsCommands::Status { id, requested_by } => {
            let view = runner.job_status(status_lookup(id, requested_by)).await?;
            match view {
                JobStatusView::NoJob => println!("no scrape job found"),
                JobStatusView::Found(job) => {
                    println!("{}", serde_json::to_string_pretty(&job)?);
                }
            }
        }
    }

    Ok(())
}

fn status_lookup(id: Option<Uuid>, requested_by: Option<String>) -> JobLookup {
    match (id, requested_by) {
        (Some(id), _) => JobLookup::ById(id),
        (None, Some(requested_by)) => JobLookup::LatestFor(requested_by),
        (None, None) => JobLookup::Latest,
    }
}

fn print_job(job: &ScrapeJob) {
    println!(
        "job {} [{}] cursor {}/{} ({} remaining) processed {} failed {} reels {}",
        job.id,
        job.status,
        job.cursor,
        job.accounts_total,
        job.remaining_accounts(),
        job.accounts_processed,
        job.failed_accounts,
        job.total_reels
    );
    if let Some(error) = &job.last_error {
        println!("  last error: {error}");
    }
}
