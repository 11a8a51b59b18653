//! Composite 0–100 virality score across a cohort of reels.

use serde::{Deserialize, Serialize};
use viralreels_core::{ViralCategory, ViralityMetrics};

use crate::metrics::{calculate_reel_metrics, ReelViralityInput};
use crate::normalize::outlier_bounds;

const WEIGHT_VIEW_TO_FOLLOWER: f64 = 0.40;
const WEIGHT_ENGAGEMENT: f64 = 0.35;
const WEIGHT_MULTIPLIER: f64 = 0.20;
const WEIGHT_ACCELERATION: f64 = 0.05;

/// Engagement per view is tiny next to the other signals; it is scaled up
/// before bounds are computed.
const ENGAGEMENT_SCALE: f64 = 10.0;

/// Raw metrics plus the composite score for one reel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReelViralityScore {
    pub metrics: ViralityMetrics,
    /// In `[0, 100]`, rounded to two decimals.
    pub viral_score: f64,
    pub viral_category: ViralCategory,
}

/// Scores every reel relative to the rest of `cohort`.
///
/// Output order matches input order. An empty cohort yields an empty vector,
/// and a cohort of one always scores `0` because its bounds are degenerate.
#[must_use]
pub fn score_cohort(cohort: &[ReelViralityInput]) -> Vec<ReelViralityScore> {
    if cohort.is_empty() {
        return Vec::new();
    }

    let metrics: Vec<ViralityMetrics> = cohort.iter().map(calculate_reel_metrics).collect();

    let signal = |f: fn(&ViralityMetrics) -> f64| -> Vec<f64> { metrics.iter().map(f).collect() };
    let vfr = outlier_bounds(&signal(|m| m.view_to_follower_ratio));
    let erv = outlier_bounds(&signal(|m| m.engagement_rate_per_view * ENGAGEMENT_SCALE));
    let multiplier = outlier_bounds(&signal(|m| m.virality_multiplier));
    let acceleration = outlier_bounds(&signal(|m| m.acceleration));

    metrics
        .into_iter()
        .map(|m| {
            let weighted = WEIGHT_VIEW_TO_FOLLOWER * vfr.normalize(m.view_to_follower_ratio)
                + WEIGHT_ENGAGEMENT
                    * erv.normalize(m.engagement_rate_per_view * ENGAGEMENT_SCALE)
                + WEIGHT_MULTIPLIER * multiplier.normalize(m.virality_multiplier)
                + WEIGHT_ACCELERATION * acceleration.normalize(m.acceleration);

            let score = (weighted * 100.0).clamp(0.0, 100.0);
            ReelViralityScore {
                metrics: m,
                viral_score: round_to_hundredths(score),
                viral_category: ViralCategory::from_score(score),
            }
        })
        .collect()
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
