//! Prioritized field aliases for raw scraper records.
//!
//! The scraping API has returned differently-named fields for the same
//! value across actor versions. Each canonical field lists its known source
//! paths in priority order; the first path holding a usable value wins.
//! Dotted paths descend into nested objects (`musicInfo.song_name`).
//!
//! | Canonical field     | Source paths, highest priority first                                        |
//! |---------------------|-----------------------------------------------------------------------------|
//! | `external_id`       | `id`, `pk`                                                                  |
//! | `url`               | `url`, `postUrl`                                                            |
//! | `view_count`        | `videoPlayCount`, `videoViewCount`, `igPlayCount`, `playCount`, `viewCount` |
//! | `like_count`        | `likesCount`, `likeCount`, `likes`                                          |
//! | `comment_count`     | `commentsCount`, `commentCount`                                             |
//! | `share_count`       | `reshareCount`, `sharesCount`, `shareCount`                                 |
//! | `follower_count`    | `followersCount`, `followers`, `ownerFollowersCount`                        |
//!
//! The remaining tables are declared below next to their constants.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

pub const EXTERNAL_ID: &[&str] = &["id", "pk"];
pub const SHORT_CODE: &[&str] = &["shortCode", "code"];
pub const URL: &[&str] = &["url", "postUrl"];
pub const THUMBNAIL_URL: &[&str] = &["displayUrl", "thumbnailUrl", "thumbnailSrc"];
pub const VIDEO_URL: &[&str] = &["videoUrl", "videoUrlHD"];

pub const VIEWS: &[&str] = &[
    "videoPlayCount",
    "videoViewCount",
    "igPlayCount",
    "playCount",
    "viewCount",
];
pub const LIKES: &[&str] = &["likesCount", "likeCount", "likes"];
pub const COMMENTS: &[&str] = &["commentsCount", "commentCount"];
pub const SHARES: &[&str] = &["reshareCount", "sharesCount", "shareCount"];

pub const OWNER_USERNAME: &[&str] = &["ownerUsername", "owner.username"];
pub const OWNER_FULL_NAME: &[&str] = &["ownerFullName", "owner.full_name"];
pub const CAPTION: &[&str] = &["caption", "text"];
pub const HASHTAGS: &[&str] = &["hashtags"];
pub const POSTED_AT: &[&str] = &["timestamp", "takenAtTimestamp", "takenAt"];
pub const VIDEO_DURATION: &[&str] = &["videoDuration", "duration"];

pub const AUDIO_SONG: &[&str] = &["musicInfo.song_name", "musicInfo.songName"];
pub const AUDIO_ARTIST: &[&str] = &["musicInfo.artist_name", "musicInfo.artistName"];
pub const AUDIO_ID: &[&str] = &["musicInfo.audio_id", "musicInfo.audioId"];
pub const ORIGINAL_AUDIO: &[&str] = &[
    "musicInfo.uses_original_audio",
    "musicInfo.usesOriginalAudio",
];

pub const POST_TYPE: &[&str] = &["type"];
pub const PRODUCT_TYPE: &[&str] = &["productType"];

pub const PROFILE_USERNAME: &[&str] = &["username"];
pub const PROFILE_FULL_NAME: &[&str] = &["fullName", "full_name"];
pub const PROFILE_PIC_URL: &[&str] = &["profilePicUrlHD", "profilePicUrl"];
pub const BIOGRAPHY: &[&str] = &["biography", "bio"];
pub const FOLLOWERS: &[&str] = &["followersCount", "followers", "ownerFollowersCount"];
pub const LATEST_POSTS: &[&str] = &["latestPosts"];

fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(item, |node, key| node.get(key))
        .filter(|v| !v.is_null())
}

/// First non-null value among `aliases`.
#[must_use]
pub fn first_defined<'a>(item: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|path| lookup(item, path))
}

/// First alias holding a non-empty string. Numbers are rendered as strings
/// so numeric ids resolve too.
#[must_use]
pub fn resolve_string(item: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|path| match lookup(item, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First alias holding a number (or numeric string), coerced to a
/// non-negative integer. Missing or malformed counts resolve to `0`.
#[must_use]
pub fn resolve_count(item: &Value, aliases: &[&str]) -> i64 {
    resolve_f64(item, aliases).map_or(0, to_count)
}

/// Like [`resolve_count`] but distinguishes "absent" from zero.
#[must_use]
pub fn resolve_optional_count(item: &Value, aliases: &[&str]) -> Option<i64> {
    resolve_f64(item, aliases).map(to_count)
}

#[must_use]
pub fn resolve_f64(item: &Value, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|path| match lookup(item, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[must_use]
pub fn resolve_bool(item: &Value, aliases: &[&str]) -> Option<bool> {
    aliases
        .iter()
        .find_map(|path| lookup(item, path)?.as_bool())
}

/// Accepts RFC 3339 strings and unix timestamps (seconds).
#[must_use]
pub fn resolve_timestamp(item: &Value, aliases: &[&str]) -> Option<DateTime<Utc>> {
    aliases.iter().find_map(|path| match lookup(item, path)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    })
}

#[must_use]
pub fn resolve_array<'a>(item: &'a Value, aliases: &[&str]) -> Option<&'a Vec<Value>> {
    aliases
        .iter()
        .find_map(|path| lookup(item, path)?.as_array())
}

// `as` saturates, so huge values clamp to i64::MAX.
#[allow(clippy::cast_possible_truncation)]
fn to_count(value: f64) -> i64 {
    if value.is_finite() && value > 0.0 {
        value as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn views_prefer_play_count_over_view_count() {
        let item = json!({ "videoViewCount": 10, "videoPlayCount": 25, "playCount": 99 });
        assert_eq!(resolve_count(&item, VIEWS), 25);
    }

    #[test]
    fn null_alias_falls_through_to_next() {
        let item = json!({ "videoPlayCount": null, "igPlayCount": 40 });
        assert_eq!(resolve_count(&item, VIEWS), 40);
    }

    #[test]
    fn missing_and_negative_counts_are_zero() {
        assert_eq!(resolve_count(&json!({}), LIKES), 0);
        assert_eq!(resolve_count(&json!({ "likesCount": -1 }), LIKES), 0);
        assert_eq!(resolve_count(&json!({ "likesCount": "12" }), LIKES), 12);
    }

    #[test]
    fn nested_paths_resolve() {
        let item = json!({ "musicInfo": { "song_name": "Song", "uses_original_audio": true } });
        assert_eq!(resolve_string(&item, AUDIO_SONG).as_deref(), Some("Song"));
        assert_eq!(resolve_bool(&item, ORIGINAL_AUDIO), Some(true));
        assert_eq!(resolve_string(&item, AUDIO_ARTIST), None);
    }

    #[test]
    fn numeric_ids_render_as_strings() {
        let item = json!({ "id": 3_141_592_653_u64 });
        assert_eq!(resolve_string(&item, EXTERNAL_ID).as_deref(), Some("3141592653"));
    }

    #[test]
    fn timestamps_accept_rfc3339_and_unix_seconds() {
        let iso = json!({ "timestamp": "2024-05-01T12:00:00.000Z" });
        let unix = json!({ "takenAtTimestamp": 1_714_564_800 });
        assert_eq!(resolve_timestamp(&iso, POSTED_AT), resolve_timestamp(&unix, POSTED_AT));
        assert!(resolve_timestamp(&json!({ "timestamp": "yesterday" }), POSTED_AT).is_none());
    }
}
