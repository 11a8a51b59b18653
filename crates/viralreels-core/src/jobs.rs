use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle state of a [`ScrapeJob`].
///
/// ```text
/// queued ──► running ──► completed
///    │          │  ▲
///    │          └──┘ (one slice per invocation)
///    ├──────────────────► completed (nothing to scrape)
///    └──────────────────► failed ◄── running
/// ```
///
/// `completed` and `failed` are terminal: a fresh job is created to scrape again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Error)]
#[error("unknown scrape job status: {0}")]
pub struct ParseJobStatusError(pub String);

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Queued, Self::Running | Self::Completed | Self::Failed)
            | (Self::Running, Self::Running | Self::Completed | Self::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseJobStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ParseJobStatusError(other.to_string())),
        }
    }
}

/// A resumable scrape over the ordered list of active accounts.
///
/// `cursor` indexes the next account to scrape; `0 <= cursor <= accounts_total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub requested_by: Option<String>,
    pub status: JobStatus,
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

impl ScrapeJob {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Accounts left before the job completes, against the last known total.
    #[must_use]
    pub fn remaining_accounts(&self) -> i32 {
        (self.accounts_total - self.cursor).max(0)
    }
}
