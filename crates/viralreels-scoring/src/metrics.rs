use serde::{Deserialize, Serialize};
use viralreels_core::ViralityMetrics;

/// Raw counts for one reel plus its account-level reference data.
///
/// Counts are `f64` so that malformed upstream values (negative, NaN,
/// infinite) can be carried through and sanitized here rather than at every
/// call site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReelViralityInput {
    pub follower_count: f64,
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
    pub shares: f64,
    /// Daily view snapshots, oldest first.
    #[serde(default)]
    pub daily_views_history: Vec<f64>,
    /// View counts of the account's most recent reels.
    #[serde(default)]
    pub last_10_reels_views: Vec<f64>,
}

/// Divides, returning `0.0` when either operand is non-finite or the
/// denominator is not strictly positive.
#[must_use]
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if !numerator.is_finite() || !denominator.is_finite() || denominator <= 0.0 {
        return 0.0;
    }
    numerator / denominator
}

fn safe_count(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the raw (un-normalized) metrics for a single reel.
#[must_use]
pub fn calculate_reel_metrics(input: &ReelViralityInput) -> ViralityMetrics {
    let followers = safe_count(input.follower_count);
    let views = safe_count(input.views);
    let likes = safe_count(input.likes);
    let comments = safe_count(input.comments);
    let shares = safe_count(input.shares);

    let reference: Vec<f64> = input
        .last_10_reels_views
        .iter()
        .copied()
        .map(safe_count)
        .collect();
    let baseline_views = mean(&reference);

    let history: Vec<f64> = input
        .daily_views_history
        .iter()
        .copied()
        .map(safe_count)
        .collect();
    let acceleration = match history.as_slice() {
        [.., previous, latest] => safe_divide(latest - previous, followers),
        _ => 0.0,
    };

    ViralityMetrics {
        view_to_follower_ratio: safe_divide(views, followers),
        engagement_rate_per_view: safe_divide(likes + comments, views),
        share_rate: safe_divide(shares, views),
        baseline_views,
        virality_multiplier: safe_divide(views, baseline_views),
        acceleration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(views: f64) -> ReelViralityInput {
        ReelViralityInput {
            follower_count: 10_000.0,
            views,
            likes: 500.0,
            comments: 50.0,
            shares: 20.0,
            daily_views_history: Vec::new(),
            last_10_reels_views: vec![1000.0, 3000.0],
        }
    }

    #[test]
    fn safe_divide_guards_denominator() {
        assert_eq!(safe_divide(10.0, 0.0), 0.0);
        assert_eq!(safe_divide(10.0, -2.0), 0.0);
        assert_eq!(safe_divide(10.0, f64::NAN), 0.0);
        assert_eq!(safe_divide(f64::INFINITY, 2.0), 0.0);
        assert_eq!(safe_divide(10.0, 4.0), 2.5);
    }

    #[test]
    fn computes_ratios() {
        let m = calculate_reel_metrics(&input(20_000.0));
        assert_eq!(m.view_to_follower_ratio, 2.0);
        assert_eq!(m.engagement_rate_per_view, 550.0 / 20_000.0);
        assert_eq!(m.share_rate, 20.0 / 20_000.0);
        assert_eq!(m.baseline_views, 2000.0);
        assert_eq!(m.virality_multiplier, 10.0);
        assert_eq!(m.acceleration, 0.0);
    }

    #[test]
    fn zero_or_negative_views_zero_out_per_view_rates() {
        for views in [0.0, -500.0, f64::NAN] {
            let m = calculate_reel_metrics(&input(views));
            assert_eq!(m.engagement_rate_per_view, 0.0);
            assert_eq!(m.share_rate, 0.0);
            assert_eq!(m.virality_multiplier, 0.0);
            assert_eq!(m.view_to_follower_ratio, 0.0);
        }
    }

    #[test]
    fn acceleration_uses_last_two_days() {
        let mut reel = input(5000.0);
        reel.daily_views_history = vec![100.0, 1000.0, 3000.0];
        let m = calculate_reel_metrics(&reel);
        assert_eq!(m.acceleration, 2000.0 / 10_000.0);
    }

    #[test]
    fn acceleration_may_be_negative_when_views_drop() {
        let mut reel = input(5000.0);
        reel.daily_views_history = vec![3000.0, 1000.0];
        let m = calculate_reel_metrics(&reel);
        assert_eq!(m.acceleration, -0.2);
    }

    #[test]
    fn acceleration_needs_two_entries_and_followers() {
        let mut reel = input(5000.0);
        reel.daily_views_history = vec![3000.0];
        assert_eq!(calculate_reel_metrics(&reel).acceleration, 0.0);

        reel.daily_views_history = vec![1000.0, 3000.0];
        reel.follower_count = 0.0;
        assert_eq!(calculate_reel_metrics(&reel).acceleration, 0.0);
    }

    #[test]
    fn empty_reference_list_means_no_baseline() {
        let mut reel = input(5000.0);
        reel.last_10_reels_views.clear();
        let m = calculate_reel_metrics(&reel);
        assert_eq!(m.baseline_views, 0.0);
        assert_eq!(m.virality_multiplier, 0.0);
    }
}
