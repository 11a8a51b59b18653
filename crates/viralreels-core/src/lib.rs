pub mod accounts;
pub mod app_config;
pub mod config;
pub mod feed;
pub mod jobs;
pub mod reels;
pub mod virality;

use thiserror::Error;

pub use accounts::{ProfileUpdate, TrackedAccount};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use feed::{FeedFilter, FeedSort, ParseFeedOptionError};
pub use jobs::{JobStatus, ParseJobStatusError, ScrapeJob};
pub use reels::NormalizedReel;
pub use virality::{ViralCategory, ViralityMetrics};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
