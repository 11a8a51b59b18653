use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::virality::{ViralCategory, ViralityMetrics};

/// A reel scraped from a tracked account, normalized and scored for storage.
///
/// Upserted on `external_id`, so re-scraping the same reel refreshes its
/// counts and score instead of creating a second row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReel {
    /// Instagram media id.
    pub external_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub author_username: Option<String>,
    pub author_full_name: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Vec<String>,
    /// `"Artist - Song"` when both parts are known, otherwise the song name.
    pub audio_track: Option<String>,
    pub audio_id: Option<String>,
    pub is_original_audio: bool,
    /// Duration in seconds.
    pub video_duration: Option<f64>,
    /// Follower count of the owning account at scrape time.
    pub follower_count: i64,
    pub posted_at: Option<DateTime<Utc>>,
    /// Composite score in `[0, 100]`, rounded to two decimals.
    pub viral_score: f64,
    pub viral_category: ViralCategory,
    pub metrics: ViralityMetrics,
    pub is_rising_star: bool,
}

impl NormalizedReel {
    /// Returns `true` when the reel uses licensed (non-original) audio.
    #[must_use]
    pub fn has_trending_audio_candidate(&self) -> bool {
        self.audio_track.is_some() && !self.is_original_audio
    }
}
