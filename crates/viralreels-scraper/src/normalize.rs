//! Conversion from raw scraper records to [`viralreels_core::NormalizedReel`].
//!
//! Field lookups go through [`crate::aliases`]; scoring is applied later by
//! [`crate::adapter`] once the whole account cohort is known.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use viralreels_core::{NormalizedReel, ViralCategory, ViralityMetrics};

use crate::aliases::{self, resolve_count, resolve_string};
use crate::source::RawScrapeItem;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\p{L}\p{N}_]+)").expect("valid hashtag regex"));

/// Raw records for one account, split by shape.
#[derive(Debug, Default)]
pub struct AccountRecords<'a> {
    /// Profile-shaped record (`username`, `followersCount`, `latestPosts`).
    pub profile: Option<&'a RawScrapeItem>,
    /// Post records, both nested under a profile and flat.
    pub posts: Vec<&'a RawScrapeItem>,
}

/// Groups raw items by lowercase account handle.
///
/// Profile records contribute their `latestPosts`; flat post records are
/// grouped by owner. Items carrying neither handle are dropped.
#[must_use]
pub fn group_by_account(items: &[RawScrapeItem]) -> HashMap<String, AccountRecords<'_>> {
    let mut groups: HashMap<String, AccountRecords<'_>> = HashMap::new();
    for item in items {
        if is_profile_record(item) {
            let Some(handle) = resolve_string(item, aliases::PROFILE_USERNAME) else {
                continue;
            };
            let entry = groups.entry(handle_key(&handle)).or_default();
            entry.profile = Some(item);
            if let Some(posts) = aliases::resolve_array(item, aliases::LATEST_POSTS) {
                entry.posts.extend(posts.iter());
            }
        } else if let Some(owner) = resolve_string(item, aliases::OWNER_USERNAME) {
            groups.entry(handle_key(&owner)).or_default().posts.push(item);
        } else {
            tracing::debug!("dropping scrape item without an owner handle");
        }
    }
    groups
}

/// Canonical form of an account handle used for grouping.
#[must_use]
pub fn handle_key(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

fn is_profile_record(item: &RawScrapeItem) -> bool {
    aliases::resolve_array(item, aliases::LATEST_POSTS).is_some()
        || (aliases::first_defined(item, aliases::OWNER_USERNAME).is_none()
            && aliases::first_defined(item, aliases::PROFILE_USERNAME).is_some()
            && aliases::first_defined(item, aliases::FOLLOWERS).is_some())
}

/// Keeps video clips only. Each check applies only when its field is present.
#[must_use]
pub fn is_reel(item: &RawScrapeItem) -> bool {
    let type_ok = resolve_string(item, aliases::POST_TYPE).is_none_or(|t| t == "Video");
    let product_ok =
        resolve_string(item, aliases::PRODUCT_TYPE).is_none_or(|p| p == "clips");
    type_ok && product_ok
}

/// Hashtags from the record, falling back to `#tags` parsed out of the caption.
#[must_use]
pub fn extract_hashtags(item: &RawScrapeItem, caption: Option<&str>) -> Vec<String> {
    if let Some(tags) = aliases::resolve_array(item, aliases::HASHTAGS) {
        let tags: Vec<String> = tags
            .iter()
            .filter_map(|t| t.as_str())
            .map(|t| t.trim_start_matches('#').to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            return tags;
        }
    }
    let Some(caption) = caption else {
        return Vec::new();
    };
    let mut seen = Vec::new();
    for cap in HASHTAG_RE.captures_iter(caption) {
        let tag = cap[1].to_owned();
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

fn audio_track(item: &RawScrapeItem) -> Option<String> {
    let song = resolve_string(item, aliases::AUDIO_SONG)?;
    Some(match resolve_string(item, aliases::AUDIO_ARTIST) {
        Some(artist) => format!("{artist} - {song}"),
        None => song,
    })
}

fn reel_url(item: &RawScrapeItem) -> Option<String> {
    resolve_string(item, aliases::URL).or_else(|| {
        resolve_string(item, aliases::SHORT_CODE)
            .map(|code| format!("https://www.instagram.com/reel/{code}/"))
    })
}

/// Maps one post record to an unscored reel.
///
/// Returns `None` when the record lacks an id or any way to build its URL;
/// such records cannot be upserted.
#[must_use]
pub fn normalize_reel(item: &RawScrapeItem, follower_count: i64) -> Option<NormalizedReel> {
    let external_id = resolve_string(item, aliases::EXTERNAL_ID)?;
    let url = reel_url(item)?;
    let caption = resolve_string(item, aliases::CAPTION);
    let hashtags = extract_hashtags(item, caption.as_deref());

    Some(NormalizedReel {
        external_id,
        url,
        thumbnail_url: resolve_string(item, aliases::THUMBNAIL_URL),
        video_url: resolve_string(item, aliases::VIDEO_URL),
        view_count: resolve_count(item, aliases::VIEWS),
        like_count: resolve_count(item, aliases::LIKES),
        comment_count: resolve_count(item, aliases::COMMENTS),
        share_count: resolve_count(item, aliases::SHARES),
        author_username: resolve_string(item, aliases::OWNER_USERNAME),
        author_full_name: resolve_string(item, aliases::OWNER_FULL_NAME),
        caption,
        hashtags,
        audio_track: audio_track(item),
        audio_id: resolve_string(item, aliases::AUDIO_ID),
        is_original_audio: aliases::resolve_bool(item, aliases::ORIGINAL_AUDIO).unwrap_or(false),
        video_duration: aliases::resolve_f64(item, aliases::VIDEO_DURATION)
            .filter(|d| d.is_finite() && *d >= 0.0),
        follower_count,
        posted_at: aliases::resolve_timestamp(item, aliases::POSTED_AT),
        viral_score: 0.0,
        viral_category: ViralCategory::Underperforming,
        metrics: ViralityMetrics::default(),
        is_rising_star: false,
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
