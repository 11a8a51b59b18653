use thiserror::Error;
use uuid::Uuid;
use viralreels_core::JobStatus;
use viralreels_db::DbError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("scrape job {0} not found")]
    NotFound(Uuid),

    /// Another writer advanced or finished the job first.
    #[error("scrape job {id} was updated concurrently")]
    ConcurrentUpdate { id: Uuid },

    #[error("scrape job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("no active scrape job after {attempts} creation attempts")]
    Contention { attempts: u32 },

    #[error(transparent)]
    Store(#[from] DbError),
}
