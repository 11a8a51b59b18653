//! Resumable, rate-limited scrape jobs over the tracked account list.
//!
//! [`ScrapeJobRunner`] owns the job state machine
//! (`queued → running → completed | failed`) and talks to storage only through
//! [`JobStore`], so the same engine runs against Postgres ([`PgJobStore`]) in
//! the server and CLI and against an in-memory store in tests.

pub mod engine;
pub mod error;
pub mod pg;
pub mod store;

pub use engine::{
    BatchProgress, JobLookup, JobSettings, JobStatusView, RunnerOutcome, ScrapeJobRunner,
};
pub use error::JobError;
pub use pg::{PgJobStore, PgScrapeJobRunner};
pub use store::JobStore;
