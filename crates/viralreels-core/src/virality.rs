use serde::{Deserialize, Serialize};

/// Categorical label for a 0–100 composite virality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViralCategory {
    Underperforming,
    Average,
    Strong,
    Viral,
    Exploding,
}

impl ViralCategory {
    /// Maps a composite score to its category.
    ///
    /// | Score      | Category          |
    /// |------------|-------------------|
    /// | `< 30`     | `Underperforming` |
    /// | `< 50`     | `Average`         |
    /// | `< 70`     | `Strong`          |
    /// | `< 85`     | `Viral`           |
    /// | otherwise  | `Exploding`       |
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::Underperforming
        } else if score < 50.0 {
            Self::Average
        } else if score < 70.0 {
            Self::Strong
        } else if score < 85.0 {
            Self::Viral
        } else {
            Self::Exploding
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Underperforming => "Underperforming",
            Self::Average => "Average",
            Self::Strong => "Strong",
            Self::Viral => "Viral",
            Self::Exploding => "Exploding",
        }
    }

    /// Parses the stored label; unknown labels fall back to `Underperforming`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "Average" => Self::Average,
            "Strong" => Self::Strong,
            "Viral" => Self::Viral,
            "Exploding" => Self::Exploding,
            _ => Self::Underperforming,
        }
    }
}

impl std::fmt::Display for ViralCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-reel derived engagement metrics.
///
/// Every field is finite; degenerate denominators resolve to `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViralityMetrics {
    pub view_to_follower_ratio: f64,
    pub engagement_rate_per_view: f64,
    pub share_rate: f64,
    /// Mean views of the account's recent reference reels.
    pub baseline_views: f64,
    /// Views divided by `baseline_views`.
    pub virality_multiplier: f64,
    /// Day-over-day view delta divided by follower count.
    pub acceleration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_thresholds() {
        assert_eq!(ViralCategory::from_score(0.0), ViralCategory::Underperforming);
        assert_eq!(ViralCategory::from_score(29.99), ViralCategory::Underperforming);
        assert_eq!(ViralCategory::from_score(30.0), ViralCategory::Average);
        assert_eq!(ViralCategory::from_score(49.99), ViralCategory::Average);
        assert_eq!(ViralCategory::from_score(50.0), ViralCategory::Strong);
        assert_eq!(ViralCategory::from_score(70.0), ViralCategory::Viral);
        assert_eq!(ViralCategory::from_score(84.99), ViralCategory::Viral);
        assert_eq!(ViralCategory::from_score(85.0), ViralCategory::Exploding);
        assert_eq!(ViralCategory::from_score(100.0), ViralCategory::Exploding);
    }

    #[test]
    fn unknown_label_falls_back_to_underperforming() {
        assert_eq!(ViralCategory::from_label("hot"), ViralCategory::Underperforming);
        assert_eq!(ViralCategory::from_label("Viral"), ViralCategory::Viral);
    }
}
