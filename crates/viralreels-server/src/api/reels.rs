use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use viralreels_core::{FeedFilter, FeedSort, ViralityMetrics};
use viralreels_db::{ReelFeedQuery, ReelRow, TrendingAudioRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

const DEFAULT_PAGE_SIZE: i64 = 24;
const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_TRENDING_LIMIT: i64 = 10;
const MAX_TRENDING_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub(super) struct ReelFeedParams {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub account_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendingAudioParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ReelItem {
    id: Uuid,
    external_id: String,
    url: String,
    thumbnail_url: Option<String>,
    video_url: Option<String>,
    view_count: i64,
    like_count: i64,
    comment_count: i64,
    share_count: i64,
    author_username: Option<String>,
    author_full_name: Option<String>,
    caption: Option<String>,
    hashtags: Vec<String>,
    audio_track: Option<String>,
    audio_id: Option<String>,
    is_original_audio: bool,
    video_duration: Option<f64>,
    follower_count: i64,
    posted_at: Option<DateTime<Utc>>,
    viral_score: f64,
    viral_category: String,
    is_rising_star: bool,
    metrics: ViralityMetrics,
    updated_at: DateTime<Utc>,
}

impl From<ReelRow> for ReelItem {
    fn from(row: ReelRow) -> Self {
        // Rows written before a metric existed fall back to zeroed metrics.
        let metrics = serde_json::from_value(row.metrics).unwrap_or_default();
        Self {
            id: row.id,
            external_id: row.external_id,
            url: row.url,
            thumbnail_url: row.thumbnail_url,
            video_url: row.video_url,
            view_count: row.view_count,
            like_count: row.like_count,
            comment_count: row.comment_count,
            share_count: row.share_count,
            author_username: row.author_username,
            author_full_name: row.author_full_name,
            caption: row.caption,
            hashtags: row.hashtags,
            audio_track: row.audio_track,
            audio_id: row.audio_id,
            is_original_audio: row.is_original_audio,
            video_duration: row.video_duration,
            follower_count: row.follower_count,
            posted_at: row.posted_at,
            viral_score: row.viral_score,
            viral_category: row.viral_category,
            is_rising_star: row.is_rising_star,
            metrics,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct FeedPage {
    reels: Vec<ReelItem>,
    total: i64,
    page: i64,
    page_size: i64,
    total_pages: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendingAudioItem {
    audio_track: String,
    audio_id: Option<String>,
    reel_count: i64,
    total_views: i64,
    top_viral_score: f64,
}

impl From<TrendingAudioRow> for TrendingAudioItem {
    fn from(row: TrendingAudioRow) -> Self {
        Self {
            audio_track: row.audio_track,
            audio_id: row.audio_id,
            reel_count: row.reel_count,
            total_views: row.total_views,
            top_viral_score: row.top_viral_score,
        }
    }
}

fn parse_option<T>(raw: Option<&str>, request_id: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = viralreels_core::ParseFeedOptionError> + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(T::default()),
        Some(value) => value
            .parse()
            .map_err(|e: viralreels_core::ParseFeedOptionError| {
                ApiError::new(request_id, "validation_error", e.to_string())
            }),
    }
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

pub(super) async fn list_reels(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ReelFeedParams>,
) -> Result<Json<ApiResponse<FeedPage>>, ApiError> {
    let filter: FeedFilter = parse_option(params.filter.as_deref(), &req_id.0)?;
    let sort: FeedSort = parse_option(params.sort.as_deref(), &req_id.0)?;
    let page = params.page.unwrap_or(1).max(1);
    let page_size = normalize_limit(params.page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

    let query = ReelFeedQuery {
        filter,
        sort,
        account_id: params.account_id,
        search: params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        limit: page_size,
        offset: (page - 1).saturating_mul(page_size),
        now: Utc::now(),
    };

    let rows = viralreels_db::list_reels(&state.pool, &query)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let total = viralreels_db::count_reels(&state.pool, &query)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = FeedPage {
        reels: rows.into_iter().map(ReelItem::from).collect(),
        total,
        page,
        page_size,
        total_pages: total_pages(total, page_size),
    };
    Ok(ApiResponse::new(data, req_id.0))
}

pub(super) async fn get_reel(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(reel_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReelItem>>, ApiError> {
    let row = viralreels_db::get_reel(&state.pool, reel_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "not_found", format!("reel {reel_id} not found"))
        })?;

    Ok(ApiResponse::new(ReelItem::from(row), req_id.0))
}

pub(super) async fn list_trending_audio(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<TrendingAudioParams>,
) -> Result<Json<ApiResponse<Vec<TrendingAudioItem>>>, ApiError> {
    let limit = normalize_limit(params.limit, DEFAULT_TRENDING_LIMIT, MAX_TRENDING_LIMIT);
    let rows = viralreels_db::trending_audio(&state.pool, limit)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        rows.into_iter().map(TrendingAudioItem::from).collect(),
        req_id.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 24), 0);
        assert_eq!(total_pages(24, 24), 1);
        assert_eq!(total_pages(25, 24), 2);
    }

    #[test]
    fn blank_options_fall_back_to_defaults() {
        let filter: FeedFilter = parse_option(Some("  "), "req").unwrap();
        assert_eq!(filter, FeedFilter::All);
        let sort: FeedSort = parse_option(None, "req").unwrap();
        assert_eq!(sort, FeedSort::Virality);
        let sort: FeedSort = parse_option(Some("Shares"), "req").unwrap();
        assert_eq!(sort, FeedSort::Shares);
    }

    #[test]
    fn unknown_filter_is_a_validation_error() {
        let err = parse_option::<FeedFilter>(Some("popular"), "req").unwrap_err();
        assert_eq!(err.error.code, "validation_error");
        assert!(err.error.message.contains("popular"));
    }

    #[test]
    fn malformed_metrics_default_to_zero() {
        let metrics: ViralityMetrics =
            serde_json::from_value(serde_json::json!({"unexpected": true})).unwrap_or_default();
        assert_eq!(metrics, ViralityMetrics::default());
    }
}
