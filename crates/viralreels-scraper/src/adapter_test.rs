use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use serde_json::{json, Value};
use uuid::Uuid;
use viralreels_core::ViralCategory;

use super::*;

/// Replays queued responses and records every call's handles.
#[derive(Default)]
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<Value>, ScraperError>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedSource {
    fn push(&self, response: Result<Vec<Value>, ScraperError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScrapeSource for ScriptedSource {
    async fn fetch(
        &self,
        handles: &[String],
        _per_account_limit: u32,
    ) -> Result<Vec<RawScrapeItem>, ScraperError> {
        self.calls.lock().unwrap().push(handles.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn settings() -> ScraperSettings {
    ScraperSettings {
        reels_per_account: 5,
        max_retries: 2,
        backoff_base_ms: 0,
        inter_call_delay: Duration::ZERO,
    }
}

fn account(username: &str, follower_count: Option<i64>) -> TrackedAccount {
    TrackedAccount {
        id: Uuid::new_v4(),
        username: username.to_owned(),
        full_name: None,
        profile_pic_url: None,
        follower_count,
        biography: None,
        active: true,
        last_scraped_at: None,
        created_at: Utc::now(),
    }
}

fn post(id: &str, owner: &str, views: i64, likes: i64, hours_ago: i64) -> Value {
    let posted = Utc::now() - ChronoDuration::hours(hours_ago);
    json!({
        "id": id,
        "type": "Video",
        "productType": "clips",
        "url": format!("https://www.instagram.com/reel/{id}/"),
        "ownerUsername": owner,
        "videoPlayCount": views,
        "likesCount": likes,
        "commentsCount": 10,
        "timestamp": posted.to_rfc3339(),
    })
}

fn profile(username: &str, followers: i64, posts: Vec<Value>) -> Value {
    json!({
        "username": username,
        "fullName": format!("{username} official"),
        "followersCount": followers,
        "profilePicUrlHD": "https://cdn.example/hd.jpg",
        "profilePicUrl": "https://cdn.example/sd.jpg",
        "biography": "bio",
        "latestPosts": posts,
    })
}

fn bad_status() -> ScraperError {
    ScraperError::UnexpectedStatus {
        status: 500,
        url: "https://api.apify.com/v2/acts/x/runs".to_owned(),
        body: "boom".to_owned(),
    }
}

#[tokio::test]
async fn one_combined_call_serves_every_account_in_order() {
    let source = ScriptedSource::default();
    source.push(Ok(vec![
        profile("beta", 2000, vec![post("b1", "beta", 500, 50, 5)]),
        profile("alpha", 1000, vec![post("a1", "alpha", 100, 5, 5)]),
    ]));
    let scraper = ReelScraper::new(source, settings());
    let accounts = vec![account("alpha", None), account("beta", None)];

    let results = scraper.scrape_batch(&accounts, &ViewHistory::new()).await;

    assert_eq!(scraper.source.calls(), vec![vec!["alpha", "beta"]]);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].account.username, "alpha");
    assert_eq!(results[1].account.username, "beta");
    assert!(results.iter().all(ScrapeResult::is_success));

    let profile = results[1].profile.as_ref().unwrap();
    assert_eq!(profile.follower_count, 2000);
    assert_eq!(profile.full_name.as_deref(), Some("beta official"));
    assert_eq!(profile.profile_pic_url.as_deref(), Some("https://cdn.example/hd.jpg"));
}

#[tokio::test]
async fn account_missing_from_response_gets_no_data_error() {
    let source = ScriptedSource::default();
    source.push(Ok(vec![post("a1", "alpha", 100, 5, 5)]));
    let scraper = ReelScraper::new(source, settings());
    let accounts = vec![account("alpha", None), account("ghost", None)];

    let results = scraper.scrape_batch(&accounts, &ViewHistory::new()).await;

    assert!(results[0].is_success());
    assert_eq!(results[1].error.as_deref(), Some("no data returned for @ghost"));
    assert!(results[1].reels.is_empty());
    assert!(results[1].profile.is_none());
}

#[tokio::test]
async fn batch_failure_falls_back_to_per_account_calls() {
    let source = ScriptedSource::default();
    source.push(Err(bad_status()));
    source.push(Ok(vec![post("a1", "alpha", 100, 5, 5)]));
    source.push(Err(bad_status()));
    let scraper = ReelScraper::new(source, settings());
    let accounts = vec![account("alpha", None), account("beta", None)];

    let results = scraper.scrape_batch(&accounts, &ViewHistory::new()).await;

    assert_eq!(
        scraper.source.calls(),
        vec![vec!["alpha", "beta"], vec!["alpha"], vec!["beta"]]
    );
    assert!(results[0].is_success());
    assert_eq!(results[0].reels.len(), 1);
    assert!(results[1].error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn rate_limited_batch_is_retried_before_fallback() {
    let source = ScriptedSource::default();
    source.push(Err(ScraperError::RateLimited {
        service: "apify".to_owned(),
        retry_after_secs: 0,
    }));
    source.push(Ok(vec![post("a1", "alpha", 100, 5, 5)]));
    let scraper = ReelScraper::new(source, settings());

    let results = scraper
        .scrape_batch(&[account("alpha", None)], &ViewHistory::new())
        .await;

    assert_eq!(scraper.source.calls().len(), 2);
    assert!(results[0].is_success());
}

#[tokio::test]
async fn non_reels_are_filtered_but_counted_as_fetched() {
    let image = json!({ "id": "img", "type": "Image", "ownerUsername": "alpha", "url": "u" });
    let source = ScriptedSource::default();
    source.push(Ok(vec![post("a1", "alpha", 100, 5, 5), image]));
    let scraper = ReelScraper::new(source, settings());

    let results = scraper
        .scrape_batch(&[account("alpha", Some(10))], &ViewHistory::new())
        .await;

    assert_eq!(results[0].total_fetched, 2);
    assert_eq!(results[0].reels_filtered, 1);
}

#[tokio::test]
async fn reels_without_a_url_are_dropped_but_counted_as_fetched() {
    let mut no_url = post("a2", "alpha", 300, 5, 5);
    no_url.as_object_mut().unwrap().remove("url");
    let source = ScriptedSource::default();
    source.push(Ok(vec![post("a1", "alpha", 100, 5, 5), no_url]));
    let scraper = ReelScraper::new(source, settings());

    let results = scraper
        .scrape_batch(&[account("alpha", Some(10))], &ViewHistory::new())
        .await;

    assert!(results[0].is_success());
    assert_eq!(results[0].total_fetched, 2);
    assert_eq!(results[0].reels_filtered, 1);
    assert_eq!(results[0].reels[0].external_id, "a1");
}

#[tokio::test]
async fn follower_count_falls_back_to_last_known_value() {
    let source = ScriptedSource::default();
    source.push(Ok(vec![post("a1", "alpha", 100, 5, 5)]));
    source.push(Ok(vec![post("b1", "beta", 100, 5, 5)]));
    let scraper = ReelScraper::new(source, settings());

    let known = scraper
        .scrape_batch(&[account("alpha", Some(7777))], &ViewHistory::new())
        .await;
    assert_eq!(known[0].reels[0].follower_count, 7777);

    let unknown = scraper
        .scrape_batch(&[account("beta", None)], &ViewHistory::new())
        .await;
    assert_eq!(unknown[0].reels[0].follower_count, 0);
    assert_eq!(unknown[0].profile.as_ref().unwrap().follower_count, 0);
}

#[tokio::test]
async fn reels_are_scored_within_the_account_cohort() {
    let posts = vec![
        post("r1", "alpha", 1000, 10, 30),
        post("r2", "alpha", 1200, 12, 40),
        post("r3", "alpha", 900, 9, 50),
        post("r4", "alpha", 1100, 11, 60),
        post("r5", "alpha", 250_000, 30_000, 6),
    ];
    let source = ScriptedSource::default();
    source.push(Ok(vec![profile("alpha", 10_000, posts)]));
    let scraper = ReelScraper::new(source, settings());

    let results = scraper
        .scrape_batch(&[account("alpha", None)], &ViewHistory::new())
        .await;
    let reels = &results[0].reels;

    let star = reels.iter().find(|r| r.external_id == "r5").unwrap();
    assert!(reels
        .iter()
        .filter(|r| r.external_id != "r5")
        .all(|r| r.viral_score < star.viral_score));
    assert!(star.viral_score <= 100.0);
    assert_ne!(star.viral_category, ViralCategory::Underperforming);
    assert!(star.is_rising_star);
    assert!(star.metrics.baseline_views > 0.0);
    assert!(!reels[0].is_rising_star);
}

#[tokio::test]
async fn single_reel_cohort_scores_zero() {
    let source = ScriptedSource::default();
    source.push(Ok(vec![post("a1", "alpha", 1_000_000, 90_000, 5)]));
    let scraper = ReelScraper::new(source, settings());

    let results = scraper
        .scrape_batch(&[account("alpha", Some(100))], &ViewHistory::new())
        .await;

    assert_eq!(results[0].reels[0].viral_score, 0.0);
    assert_eq!(
        results[0].reels[0].viral_category,
        ViralCategory::Underperforming
    );
}

#[tokio::test]
async fn stored_history_drives_acceleration() {
    let source = ScriptedSource::default();
    source.push(Ok(vec![post("a1", "alpha", 5000, 50, 30)]));
    let scraper = ReelScraper::new(source, settings());
    let mut history = ViewHistory::new();
    history.insert("a1".to_owned(), vec![1000, 3000]);

    let results = scraper
        .scrape_batch(&[account("alpha", Some(1000))], &history)
        .await;

    // (5000 - 3000) / 1000
    assert_eq!(results[0].reels[0].metrics.acceleration, 2.0);
}

#[tokio::test]
async fn duplicate_records_collapse_to_one_reel() {
    let source = ScriptedSource::default();
    source.push(Ok(vec![
        profile("alpha", 10, vec![post("a1", "alpha", 100, 1, 5)]),
        post("a1", "alpha", 100, 1, 5),
    ]));
    let scraper = ReelScraper::new(source, settings());

    let results = scraper
        .scrape_batch(&[account("alpha", None)], &ViewHistory::new())
        .await;

    assert_eq!(results[0].reels.len(), 1);
}

#[tokio::test]
async fn empty_account_list_makes_no_calls() {
    let scraper = ReelScraper::new(ScriptedSource::default(), settings());
    assert!(scraper.scrape_batch(&[], &ViewHistory::new()).await.is_empty());
    assert!(scraper.source.calls().is_empty());
}
