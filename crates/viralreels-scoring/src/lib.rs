//! Batch-relative virality scoring for scraped reels.
//!
//! Every score is relative to the cohort submitted in the same call: raw
//! per-reel metrics are computed first, then four signals are normalized
//! across the cohort with outlier capping and combined into a 0–100 score.
//! All functions here are total over their inputs and perform no I/O.

pub mod metrics;
pub mod normalize;
pub mod rising;
pub mod scorer;

pub use metrics::{calculate_reel_metrics, safe_divide, ReelViralityInput};
pub use normalize::{normalize_batch, outlier_bounds, percentile, Bounds};
pub use rising::{is_rising_star, RISING_STAR_MAX_AGE_HOURS, RISING_STAR_MIN_VIEWS};
pub use scorer::{score_cohort, ReelViralityScore};
