//! Apify REST v2 client: start an actor run, wait for it, read its dataset.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::ScraperError;
use crate::source::{RawScrapeItem, ScrapeSource};

/// Longest server-side wait Apify accepts for `waitForFinish`.
const MAX_WAIT_FOR_FINISH_SECS: u64 = 60;

const SERVICE: &str = "apify";

#[derive(Debug, Clone)]
pub struct ApifyClientConfig {
    pub token: String,
    /// API root including the version segment, e.g. `https://api.apify.com/v2`.
    pub base_url: String,
    /// Actor id in `owner~name` form.
    pub actor_id: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Deadline for a whole actor run, from start to dataset read.
    pub run_timeout_secs: u64,
}

impl ApifyClientConfig {
    #[must_use]
    pub fn from_app_config(config: &viralreels_core::AppConfig) -> Self {
        Self {
            token: config.apify_token.clone(),
            base_url: config.apify_base_url.clone(),
            actor_id: config.apify_actor_id.clone(),
            request_timeout_secs: config.scraper_request_timeout_secs,
            run_timeout_secs: config.scraper_run_timeout_secs,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActorInput<'a> {
    username: &'a [String],
    usernames: &'a [String],
    results_limit: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunData {
    pub id: String,
    pub status: String,
    pub default_dataset_id: String,
}

impl RunData {
    fn is_succeeded(&self) -> bool {
        self.status == "SUCCEEDED"
    }

    fn is_failed(&self) -> bool {
        matches!(
            self.status.as_str(),
            "FAILED" | "ABORTED" | "TIMED-OUT" | "TIMED_OUT"
        )
    }
}

/// HTTP client for running the reel scraper actor.
pub struct ApifyClient {
    client: Client,
    config: ApifyClientConfig,
}

impl ApifyClient {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: ApifyClientConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn start_run(&self, handles: &[String], limit: u32) -> Result<RunData, ScraperError> {
        let url = self.url(&format!("acts/{}/runs", self.config.actor_id));
        let input = ActorInput {
            username: handles,
            usernames: handles,
            results_limit: limit,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&input)
            .send()
            .await?;
        let body = check_status(response, &url).await?;
        parse_json::<Envelope<RunData>>(&body, "actor run start").map(|e| e.data)
    }

    async fn wait_for_run(&self, run: RunData) -> Result<RunData, ScraperError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.run_timeout_secs);
        let mut run = run;
        loop {
            if run.is_succeeded() {
                return Ok(run);
            }
            if run.is_failed() {
                return Err(ScraperError::RunFailed {
                    run_id: run.id,
                    status: run.status,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ScraperError::RunTimeout {
                    run_id: run.id,
                    timeout_secs: self.config.run_timeout_secs,
                });
            }
            let wait_secs = remaining.as_secs().clamp(1, MAX_WAIT_FOR_FINISH_SECS);

            tracing::debug!(run_id = %run.id, status = %run.status, wait_secs, "actor run in progress");
            let url = self.url(&format!("actor-runs/{}", run.id));
            let response = self
                .client
                .get(&url)
                .query(&[("waitForFinish", wait_secs)])
                // Long-poll outlives the normal request timeout.
                .timeout(Duration::from_secs(
                    wait_secs + self.config.request_timeout_secs,
                ))
                .bearer_auth(&self.config.token)
                .send()
                .await?;
            let body = check_status(response, &url).await?;
            run = parse_json::<Envelope<RunData>>(&body, "actor run status")?.data;
        }
    }

    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<RawScrapeItem>, ScraperError> {
        let url = self.url(&format!("datasets/{dataset_id}/items"));
        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("clean", "true")])
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        let body = check_status(response, &url).await?;
        parse_json(&body, "dataset items")
    }
}

#[async_trait]
impl ScrapeSource for ApifyClient {
    async fn fetch(
        &self,
        handles: &[String],
        per_account_limit: u32,
    ) -> Result<Vec<RawScrapeItem>, ScraperError> {
        tracing::info!(
            accounts = handles.len(),
            per_account_limit,
            actor = %self.config.actor_id,
            "starting actor run"
        );
        let run = self.start_run(handles, per_account_limit).await?;
        let run = self.wait_for_run(run).await?;
        let items = self.dataset_items(&run.default_dataset_id).await?;
        tracing::info!(run_id = %run.id, items = items.len(), "actor run finished");
        Ok(items)
    }
}

async fn check_status(response: Response, url: &str) -> Result<String, ScraperError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        return Err(ScraperError::RateLimited {
            service: SERVICE.to_owned(),
            retry_after_secs,
        });
    }
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ScraperError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_owned(),
            body,
        });
    }
    Ok(body)
}

fn parse_json<T: serde::de::DeserializeOwned>(
    body: &str,
    context: &str,
) -> Result<T, ScraperError> {
    serde_json::from_str(body).map_err(|source| ScraperError::Deserialize {
        context: context.to_owned(),
        source,
    })
}
