use chrono::{DateTime, Duration, Utc};

pub const RISING_STAR_MAX_AGE_HOURS: i64 = 48;
pub const RISING_STAR_MIN_VIEWS: i64 = 100_000;

/// A reel is a rising star when it is younger than 48 hours and has more
/// than 100k views. Reels without a post date never qualify.
#[must_use]
pub fn is_rising_star(posted_at: Option<DateTime<Utc>>, views: i64, now: DateTime<Utc>) -> bool {
    let Some(posted_at) = posted_at else {
        return false;
    };
    now - posted_at < Duration::hours(RISING_STAR_MAX_AGE_HOURS) && views > RISING_STAR_MIN_VIEWS
}
