use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use viralreels_core::ScrapeJob;
use viralreels_jobs::{BatchProgress, JobLookup, JobStatusView, RunnerOutcome};

use crate::middleware::RequestId;

use super::{map_job_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct EnsureJobBody {
    pub requested_by: Option<String>,
    pub batch_size: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LatestJobParams {
    pub requested_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RunResult {
    /// `false` while the active job still has accounts left for a later call.
    done: bool,
    #[serde(flatten)]
    outcome: RunnerOutcome,
}

/// Returns the active job, creating one when none is queued or running.
///
/// The body is optional; a request without one uses the defaults.
pub(super) async fn ensure_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<EnsureJobBody>>,
) -> Result<Json<ApiResponse<ScrapeJob>>, ApiError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let requested_by = body
        .requested_by
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let job = state
        .runner
        .ensure_job(requested_by, body.batch_size)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(job, req_id.0))
}

pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobStatusView>>, ApiError> {
    let view = state
        .runner
        .job_status(JobLookup::ById(job_id))
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(view, req_id.0))
}

pub(super) async fn latest_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<LatestJobParams>,
) -> Result<Json<ApiResponse<JobStatusView>>, ApiError> {
    let lookup = match params.requested_by.map(|s| s.trim().to_owned()) {
        Some(requested_by) if !requested_by.is_empty() => JobLookup::LatestFor(requested_by),
        _ => JobLookup::Latest,
    };

    let view = state
        .runner
        .job_status(lookup)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(view, req_id.0))
}

/// Advances one job by a single slice of accounts.
pub(super) async fn process_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<BatchProgress>>, ApiError> {
    let progress = state
        .runner
        .process_batch(job_id)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    tracing::info!(
        request_id = %req_id.0,
        job_id = %job_id,
        status = %progress.job.status,
        cursor = progress.job.cursor,
        accounts = progress.accounts_processed,
        "scrape job batch processed"
    );
    Ok(ApiResponse::new(progress, req_id.0))
}

/// Drives the active job for up to the configured loop budget.
pub(super) async fn run_active_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<RunResult>>, ApiError> {
    let settings = state.runner.settings();
    let outcome = state
        .runner
        .run_active_job(settings.loop_budget, settings.max_loops)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(ApiResponse::new(
        RunResult {
            done: outcome.is_done(),
            outcome,
        },
        req_id.0,
    ))
}
