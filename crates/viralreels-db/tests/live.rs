//! Live integration tests for viralreels-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/viralreels-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;
use viralreels_core::{
    FeedFilter, FeedSort, JobStatus, NormalizedReel, ProfileUpdate, ViralCategory,
    ViralityMetrics,
};
use viralreels_db::{
    count_reels, create_scrape_job, fail_scrape_job, find_active_scrape_job, get_account,
    get_reel, latest_scrape_job_for, list_active_accounts, list_reels, persist_account_reels,
    save_scrape_job_progress, trending_audio, update_account_profile, view_history_for_accounts,
    DbError, ReelFeedQuery, ScrapeJobProgress,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a minimal account row and return its generated `id`.
async fn insert_test_account(pool: &sqlx::PgPool, username: &str, active: bool) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO accounts (username, active) VALUES ($1, $2) RETURNING id",
    )
    .bind(username)
    .bind(active)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_account failed for '{username}': {e}"))
}

fn make_reel(external_id: &str, views: i64, score: f64) -> NormalizedReel {
    NormalizedReel {
        external_id: external_id.to_string(),
        url: format!("https://www.instagram.com/reel/{external_id}/"),
        thumbnail_url: None,
        video_url: None,
        view_count: views,
        like_count: 10,
        comment_count: 2,
        share_count: 1,
        author_username: Some("natgeo".to_string()),
        author_full_name: None,
        caption: Some(format!("caption for {external_id} #wild")),
        hashtags: vec!["wild".to_string()],
        audio_track: None,
        audio_id: None,
        is_original_audio: true,
        video_duration: Some(12.5),
        follower_count: 1_000,
        posted_at: Some(Utc::now() - Duration::hours(2)),
        viral_score: score,
        viral_category: ViralCategory::from_score(score),
        metrics: ViralityMetrics::default(),
        is_rising_star: false,
    }
}

fn feed_query<'a>() -> ReelFeedQuery<'a> {
    ReelFeedQuery {
        filter: FeedFilter::All,
        sort: FeedSort::Virality,
        account_id: None,
        search: None,
        limit: 24,
        offset: 0,
        now: Utc::now(),
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
}

// ---------------------------------------------------------------------------
// Section 1: Accounts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn active_accounts_are_listed_alphabetically(pool: sqlx::PgPool) {
    insert_test_account(&pool, "zeta", true).await;
    insert_test_account(&pool, "Alpha", true).await;
    insert_test_account(&pool, "mid", false).await;
    insert_test_account(&pool, "beta", true).await;

    let names: Vec<String> = list_active_accounts(&pool)
        .await
        .expect("list_active_accounts failed")
        .into_iter()
        .map(|a| a.username)
        .collect();

    assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn profile_update_keeps_unobserved_fields(pool: sqlx::PgPool) {
    let id = insert_test_account(&pool, "natgeo", true).await;
    sqlx::query("UPDATE accounts SET biography = 'old bio' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();

    let update = ProfileUpdate {
        full_name: Some("National Geographic".to_string()),
        profile_pic_url: None,
        follower_count: 5_000,
        biography: None,
        last_scraped_at: Utc::now(),
    };
    update_account_profile(&pool, id, &update)
        .await
        .expect("update_account_profile failed");

    let row = get_account(&pool, id).await.unwrap().expect("account exists");
    assert_eq!(row.follower_count, Some(5_000));
    assert_eq!(row.full_name.as_deref(), Some("National Geographic"));
    assert_eq!(row.biography.as_deref(), Some("old bio"));
    assert!(row.last_scraped_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn profile_update_for_missing_account_is_not_found(pool: sqlx::PgPool) {
    let update = ProfileUpdate {
        full_name: None,
        profile_pic_url: None,
        follower_count: 1,
        biography: None,
        last_scraped_at: Utc::now(),
    };
    let err = update_account_profile(&pool, Uuid::new_v4(), &update)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 2: Reels
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upserting_same_reel_twice_keeps_one_row_with_latest_counts(pool: sqlx::PgPool) {
    let account = insert_test_account(&pool, "natgeo", true).await;

    persist_account_reels(&pool, account, &[make_reel("r1", 100, 10.0)], day(1))
        .await
        .expect("first persist failed");
    persist_account_reels(&pool, account, &[make_reel("r1", 900, 55.0)], day(1))
        .await
        .expect("second persist failed");

    let total = count_reels(&pool, &feed_query()).await.unwrap();
    assert_eq!(total, 1);

    let rows = list_reels(&pool, &feed_query()).await.unwrap();
    assert_eq!(rows[0].view_count, 900);
    assert_eq!(rows[0].viral_category, "Strong");

    let snapshots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reel_view_snapshots")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(snapshots, 1, "same-day snapshot should be replaced");

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reel_accounts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(links, 1);

    let fetched = get_reel(&pool, rows[0].id).await.unwrap().expect("reel exists");
    assert_eq!(fetched.external_id, "r1");
}

#[sqlx::test(migrations = "../../migrations")]
async fn view_history_excludes_current_day(pool: sqlx::PgPool) {
    let account = insert_test_account(&pool, "natgeo", true).await;
    for (d, views) in [(1, 100), (2, 300), (3, 700)] {
        persist_account_reels(&pool, account, &[make_reel("r1", views, 1.0)], day(d))
            .await
            .unwrap();
    }

    let history = view_history_for_accounts(&pool, &[account], day(3))
        .await
        .unwrap();
    assert_eq!(history.get("r1"), Some(&vec![100, 300]));

    let other = view_history_for_accounts(&pool, &[Uuid::new_v4()], day(3))
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn feed_filters_sort_and_search(pool: sqlx::PgPool) {
    let alpha = insert_test_account(&pool, "alpha", true).await;
    let beta = insert_test_account(&pool, "beta", true).await;

    let mut old = make_reel("old", 5_000, 20.0);
    old.posted_at = Some(Utc::now() - Duration::days(3));
    let mut rising = make_reel("rising", 250_000, 90.0);
    rising.is_rising_star = true;
    let mut licensed = make_reel("licensed", 1_000, 40.0);
    licensed.audio_track = Some("Artist - Song".to_string());
    licensed.is_original_audio = false;
    licensed.caption = Some("dance challenge".to_string());

    persist_account_reels(&pool, alpha, &[old, rising], day(1))
        .await
        .unwrap();
    persist_account_reels(&pool, beta, &[licensed], day(1))
        .await
        .unwrap();

    let ids = |rows: Vec<viralreels_db::ReelRow>| -> Vec<String> {
        rows.into_iter().map(|r| r.external_id).collect()
    };

    let all = list_reels(&pool, &feed_query()).await.unwrap();
    assert_eq!(ids(all), vec!["rising", "licensed", "old"]);

    let mut q = feed_query();
    q.filter = FeedFilter::Last24h;
    assert_eq!(count_reels(&pool, &q).await.unwrap(), 2);

    q.filter = FeedFilter::RisingStars;
    assert_eq!(ids(list_reels(&pool, &q).await.unwrap()), vec!["rising"]);

    q.filter = FeedFilter::AudioTrending;
    assert_eq!(ids(list_reels(&pool, &q).await.unwrap()), vec!["licensed"]);

    let mut q = feed_query();
    q.account_id = Some(alpha);
    q.sort = FeedSort::Views;
    assert_eq!(ids(list_reels(&pool, &q).await.unwrap()), vec!["rising", "old"]);

    let mut q = feed_query();
    q.search = Some("DANCE");
    assert_eq!(ids(list_reels(&pool, &q).await.unwrap()), vec!["licensed"]);

    let mut q = feed_query();
    q.limit = 1;
    q.offset = 1;
    assert_eq!(ids(list_reels(&pool, &q).await.unwrap()), vec!["licensed"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn trending_audio_groups_licensed_tracks(pool: sqlx::PgPool) {
    let account = insert_test_account(&pool, "alpha", true).await;
    let mut reels = Vec::new();
    for (id, track, score) in [("a", "Hit", 50.0), ("b", "Hit", 70.0), ("c", "Other", 90.0)] {
        let mut reel = make_reel(id, 100, score);
        reel.audio_track = Some(track.to_string());
        reel.is_original_audio = false;
        reels.push(reel);
    }
    let mut original = make_reel("d", 100, 99.0);
    original.audio_track = Some("Original audio".to_string());
    reels.push(original);
    persist_account_reels(&pool, account, &reels, day(1))
        .await
        .unwrap();

    let audio = trending_audio(&pool, 10).await.unwrap();
    assert_eq!(audio.len(), 2);
    assert_eq!(audio[0].audio_track, "Hit");
    assert_eq!(audio[0].reel_count, 2);
    assert_eq!(audio[0].top_viral_score, 70.0);
    assert_eq!(audio[1].audio_track, "Other");
}

// ---------------------------------------------------------------------------
// Section 3: Scrape jobs
// ---------------------------------------------------------------------------

fn progress(status: JobStatus, cursor: i32) -> ScrapeJobProgress {
    ScrapeJobProgress {
        status,
        cursor,
        accounts_total: 2,
        accounts_processed: cursor,
        failed_accounts: 0,
        total_reels: cursor * 3,
        last_error: None,
        started_at: Some(Utc::now()),
        finished_at: (status == JobStatus::Completed).then(Utc::now),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_active_job_is_rejected_as_conflict(pool: sqlx::PgPool) {
    let first = create_scrape_job(&pool, Some("cron"), 4, 10)
        .await
        .expect("first create failed");
    assert_eq!(first.status, "queued");

    let err = create_scrape_job(&pool, Some("cli"), 4, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)), "got: {err:?}");

    let active = find_active_scrape_job(&pool).await.unwrap().expect("active job");
    assert_eq!(active.id, first.id);

    fail_scrape_job(&pool, first.id, "boom").await.unwrap();
    create_scrape_job(&pool, Some("cli"), 4, 10)
        .await
        .expect("create after terminal job should succeed");
}

#[sqlx::test(migrations = "../../migrations")]
async fn progress_is_compare_and_set_on_cursor(pool: sqlx::PgPool) {
    let job = create_scrape_job(&pool, None, 1, 2).await.unwrap();

    let row = save_scrape_job_progress(&pool, job.id, 0, &progress(JobStatus::Running, 1))
        .await
        .expect("first advance failed");
    assert_eq!(row.cursor, 1);
    assert_eq!(row.status, "running");

    let err = save_scrape_job_progress(&pool, job.id, 0, &progress(JobStatus::Running, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::StaleCursor { expected_cursor: 0, .. }));

    let row = save_scrape_job_progress(&pool, job.id, 1, &progress(JobStatus::Completed, 2))
        .await
        .unwrap();
    assert_eq!(row.status, "completed");
    assert!(row.finished_at.is_some());

    let err = save_scrape_job_progress(&pool, job.id, 2, &progress(JobStatus::Running, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidJobTransition { .. }));

    let err = fail_scrape_job(&pool, job.id, "late").await.unwrap_err();
    assert!(matches!(err, DbError::InvalidJobTransition { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn latest_job_for_requester(pool: sqlx::PgPool) {
    assert!(latest_scrape_job_for(&pool, "dashboard").await.unwrap().is_none());

    let job = create_scrape_job(&pool, Some("dashboard"), 4, 3).await.unwrap();
    let latest = latest_scrape_job_for(&pool, "dashboard")
        .await
        .unwrap()
        .expect("job exists");
    assert_eq!(latest.id, job.id);
    assert!(latest_scrape_job_for(&pool, "someone-else").await.unwrap().is_none());
}
