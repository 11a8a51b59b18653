use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An Instagram account whose reels are scraped on every job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub id: Uuid,
    /// Instagram handle without the leading `@`.
    pub username: String,
    pub full_name: Option<String>,
    pub profile_pic_url: Option<String>,
    /// Last follower count observed by the scraper. `None` until the first
    /// successful scrape.
    pub follower_count: Option<i64>,
    pub biography: Option<String>,
    /// Inactive accounts are skipped by scrape jobs but keep their reels.
    pub active: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TrackedAccount {
    /// Case-insensitive handle match, ignoring a leading `@` on `handle`.
    #[must_use]
    pub fn matches_handle(&self, handle: &str) -> bool {
        self.username
            .eq_ignore_ascii_case(handle.trim().trim_start_matches('@'))
    }
}

/// Profile metadata refreshed on an account after a successful scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub profile_pic_url: Option<String>,
    pub follower_count: i64,
    pub biography: Option<String>,
    pub last_scraped_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str) -> TrackedAccount {
        TrackedAccount {
            id: Uuid::new_v4(),
            username: username.to_string(),
            full_name: None,
            profile_pic_url: None,
            follower_count: None,
            biography: None,
            active: true,
            last_scraped_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matches_handle_ignores_case_and_at_sign() {
        let a = account("natgeo");
        assert!(a.matches_handle("NatGeo"));
        assert!(a.matches_handle("@natgeo"));
        assert!(!a.matches_handle("natgeotravel"));
    }
}
