//! Batch-first scraping with per-account fallback.
//!
//! [`ReelScraper::scrape_batch`] never fails: every input account gets a
//! [`ScrapeResult`], with errors captured as strings on the result.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use viralreels_core::{AppConfig, NormalizedReel, ProfileUpdate, TrackedAccount};
use viralreels_scoring::{is_rising_star, score_cohort, ReelViralityInput};

use crate::aliases::{self, resolve_optional_count, resolve_string};
use crate::error::ScraperError;
use crate::normalize::{group_by_account, handle_key, is_reel, normalize_reel, AccountRecords};
use crate::rate_limit::retry_with_backoff;
use crate::source::{RawScrapeItem, ScrapeSource};

/// Reels per account that feed the baseline-views reference list.
const BASELINE_REEL_COUNT: usize = 10;

/// Stored daily view counts per reel `external_id`, oldest first, excluding
/// the current day.
pub type ViewHistory = HashMap<String, Vec<i64>>;

#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Posts requested per account from the source.
    pub reels_per_account: u32,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Pause between per-account calls on the fallback path.
    pub inter_call_delay: Duration,
}

impl ScraperSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            reels_per_account: config.scraper_reels_per_account,
            max_retries: config.scraper_max_retries,
            backoff_base_ms: config.scraper_retry_backoff_base_ms,
            inter_call_delay: Duration::from_millis(config.scraper_inter_call_delay_ms),
        }
    }
}

/// Outcome of scraping one account.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub account: TrackedAccount,
    /// Refreshed profile fields; `None` when the scrape failed.
    pub profile: Option<ProfileUpdate>,
    /// Post records returned for the account before the reel filter.
    pub total_fetched: usize,
    /// Reels kept after filtering and normalization.
    pub reels_filtered: usize,
    pub reels: Vec<NormalizedReel>,
    pub error: Option<String>,
}

impl ScrapeResult {
    fn failed(account: &TrackedAccount, error: String) -> Self {
        Self {
            account: account.clone(),
            profile: None,
            total_fetched: 0,
            reels_filtered: 0,
            reels: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ReelScraper<S> {
    source: S,
    settings: ScraperSettings,
}

impl<S: ScrapeSource> ReelScraper<S> {
    pub fn new(source: S, settings: ScraperSettings) -> Self {
        Self { source, settings }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scrapes `accounts` with one combined source call, falling back to one
    /// call per account if the combined call fails outright.
    ///
    /// Results come back in input order, one per account.
    pub async fn scrape_batch(
        &self,
        accounts: &[TrackedAccount],
        history: &ViewHistory,
    ) -> Vec<ScrapeResult> {
        if accounts.is_empty() {
            return Vec::new();
        }

        let handles: Vec<String> = accounts.iter().map(|a| a.username.clone()).collect();
        match self.fetch_with_retry(&handles).await {
            Ok(items) => {
                let now = Utc::now();
                let groups = group_by_account(&items);
                accounts
                    .iter()
                    .map(|account| {
                        build_result(
                            account,
                            groups.get(&handle_key(&account.username)),
                            history,
                            now,
                        )
                    })
                    .collect()
            }
            Err(err) => {
                tracing::warn!(
                    accounts = accounts.len(),
                    error = %err,
                    "batch scrape failed, falling back to per-account calls"
                );
                self.scrape_individually(accounts, history).await
            }
        }
    }

    async fn scrape_individually(
        &self,
        accounts: &[TrackedAccount],
        history: &ViewHistory,
    ) -> Vec<ScrapeResult> {
        let mut results = Vec::with_capacity(accounts.len());
        for (idx, account) in accounts.iter().enumerate() {
            if idx > 0 && !self.settings.inter_call_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_call_delay).await;
            }
            let handles = [account.username.clone()];
            let result = match self.fetch_with_retry(&handles).await {
                Ok(items) => {
                    let groups = group_by_account(&items);
                    build_result(
                        account,
                        groups.get(&handle_key(&account.username)),
                        history,
                        Utc::now(),
                    )
                }
                Err(err) => {
                    tracing::warn!(account = %account.username, error = %err, "account scrape failed");
                    ScrapeResult::failed(account, err.to_string())
                }
            };
            results.push(result);
        }
        results
    }

    async fn fetch_with_retry(&self, handles: &[String]) -> Result<Vec<RawScrapeItem>, ScraperError> {
        let limit = self.settings.reels_per_account;
        retry_with_backoff(self.settings.max_retries, self.settings.backoff_base_ms, || {
            self.source.fetch(handles, limit)
        })
        .await
    }
}

fn build_result(
    account: &TrackedAccount,
    records: Option<&AccountRecords<'_>>,
    history: &ViewHistory,
    now: DateTime<Utc>,
) -> ScrapeResult {
    let Some(records) = records else {
        return ScrapeResult::failed(
            account,
            format!("no data returned for @{}", account.username),
        );
    };

    let observed_followers = records
        .profile
        .and_then(|p| resolve_optional_count(p, aliases::FOLLOWERS))
        .or_else(|| {
            records
                .posts
                .iter()
                .find_map(|p| resolve_optional_count(p, aliases::FOLLOWERS))
        });
    let follower_count = observed_followers
        .or(account.follower_count)
        .unwrap_or(0);

    let mut seen = HashSet::new();
    let mut reels: Vec<NormalizedReel> = records
        .posts
        .iter()
        .copied()
        .filter(|item| is_reel(item))
        .filter_map(|item| {
            let reel = normalize_reel(item, follower_count);
            if reel.is_none() {
                tracing::debug!(
                    account = %account.username,
                    "dropping reel record without an id or url"
                );
            }
            reel
        })
        .filter(|reel| seen.insert(reel.external_id.clone()))
        .collect();
    for reel in &mut reels {
        if reel.author_username.is_none() {
            reel.author_username = Some(account.username.clone());
        }
    }
    score_reels(&mut reels, history, now);

    let profile = ProfileUpdate {
        full_name: records
            .profile
            .and_then(|p| resolve_string(p, aliases::PROFILE_FULL_NAME))
            .or_else(|| reels.iter().find_map(|r| r.author_full_name.clone())),
        profile_pic_url: records
            .profile
            .and_then(|p| resolve_string(p, aliases::PROFILE_PIC_URL)),
        follower_count,
        biography: records
            .profile
            .and_then(|p| resolve_string(p, aliases::BIOGRAPHY)),
        last_scraped_at: now,
    };

    tracing::debug!(
        account = %account.username,
        fetched = records.posts.len(),
        reels = reels.len(),
        follower_count,
        "account scraped"
    );

    ScrapeResult {
        account: account.clone(),
        profile: Some(profile),
        total_fetched: records.posts.len(),
        reels_filtered: reels.len(),
        reels,
        error: None,
    }
}

/// Scores an account's freshly scraped reels as one cohort.
#[allow(clippy::cast_precision_loss)]
fn score_reels(reels: &mut [NormalizedReel], history: &ViewHistory, now: DateTime<Utc>) {
    if reels.is_empty() {
        return;
    }

    let mut by_recency: Vec<&NormalizedReel> = reels.iter().collect();
    by_recency.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
    let last_views: Vec<f64> = by_recency
        .iter()
        .take(BASELINE_REEL_COUNT)
        .map(|r| r.view_count as f64)
        .collect();

    let inputs: Vec<ReelViralityInput> = reels
        .iter()
        .map(|reel| {
            let mut daily: Vec<f64> = history
                .get(&reel.external_id)
                .map(|days| days.iter().map(|v| *v as f64).collect())
                .unwrap_or_default();
            daily.push(reel.view_count as f64);
            ReelViralityInput {
                follower_count: reel.follower_count as f64,
                views: reel.view_count as f64,
                likes: reel.like_count as f64,
                comments: reel.comment_count as f64,
                shares: reel.share_count as f64,
                daily_views_history: daily,
                last_10_reels_views: last_views.clone(),
            }
        })
        .collect();

    for (reel, score) in reels.iter_mut().zip(score_cohort(&inputs)) {
        reel.metrics = score.metrics;
        reel.viral_score = score.viral_score;
        reel.viral_category = score.viral_category;
        reel.is_rising_star = is_rising_star(reel.posted_at, reel.view_count, now);
    }
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod tests;
