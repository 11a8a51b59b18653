use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Posts younger than this count as "last 24h" in the feed.
pub const LAST_24H_WINDOW_HOURS: i64 = 24;

/// Which subset of reels the feed returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFilter {
    #[default]
    All,
    /// Posted within the last 24 hours.
    Last24h,
    RisingStars,
    /// Reels using licensed audio (an `audio_track` that is not original audio).
    AudioTrending,
}

/// Primary ordering of the feed. Ties break on `posted_at` descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSort {
    #[default]
    Virality,
    Views,
    Shares,
    Comments,
}

#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseFeedOptionError {
    pub kind: &'static str,
    pub value: String,
}

impl FeedFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Last24h => "last24h",
            Self::RisingStars => "rising_stars",
            Self::AudioTrending => "audio_trending",
        }
    }
}

impl FromStr for FeedFilter {
    type Err = ParseFeedOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "last24h" | "last_24h" => Ok(Self::Last24h),
            "rising_stars" | "risingstars" => Ok(Self::RisingStars),
            "audio_trending" | "audiotrending" => Ok(Self::AudioTrending),
            _ => Err(ParseFeedOptionError {
                kind: "feed filter",
                value: s.to_string(),
            }),
        }
    }
}

impl FeedSort {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Virality => "virality",
            Self::Views => "views",
            Self::Shares => "shares",
            Self::Comments => "comments",
        }
    }
}

impl FromStr for FeedSort {
    type Err = ParseFeedOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virality" => Ok(Self::Virality),
            "views" => Ok(Self::Views),
            "shares" => Ok(Self::Shares),
            "comments" => Ok(Self::Comments),
            _ => Err(ParseFeedOptionError {
                kind: "feed sort",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_accepts_camel_and_snake_forms() {
        assert_eq!("rising_stars".parse::<FeedFilter>().unwrap(), FeedFilter::RisingStars);
        assert_eq!("risingStars".parse::<FeedFilter>().unwrap(), FeedFilter::RisingStars);
        assert_eq!("last24h".parse::<FeedFilter>().unwrap(), FeedFilter::Last24h);
    }

    #[test]
    fn unknown_sort_is_rejected() {
        let err = "likes".parse::<FeedSort>().unwrap_err();
        assert_eq!(err.kind, "feed sort");
        assert_eq!(err.to_string(), "unknown feed sort: likes");
    }

    #[test]
    fn filter_deserializes_from_query_form() {
        let filter: FeedFilter = serde_json::from_str("\"audio_trending\"").unwrap();
        assert_eq!(filter, FeedFilter::AudioTrending);
        let filter: FeedFilter = serde_json::from_str("\"last24h\"").unwrap();
        assert_eq!(filter, FeedFilter::Last24h);
    }
}
