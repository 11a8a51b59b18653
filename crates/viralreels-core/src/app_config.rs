use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub apify_token: String,
    pub apify_base_url: String,
    pub apify_actor_id: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Per-HTTP-request timeout for calls to the scraping API.
    pub scraper_request_timeout_secs: u64,
    /// Deadline for one complete actor run (start, poll, dataset read).
    pub scraper_run_timeout_secs: u64,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_ms: u64,
    pub scraper_inter_call_delay_ms: u64,
    pub scraper_reels_per_account: u32,
    pub scraper_accounts_per_call: usize,
    pub job_default_batch_size: i32,
    pub job_min_batch_size: i32,
    pub job_max_batch_size: i32,
    pub job_time_budget_secs: u64,
    pub runner_loop_budget_secs: u64,
    pub runner_max_loops: u32,
    /// Six-field cron expression for the daily job creation tick.
    pub scrape_schedule: String,
    /// Six-field cron expression for the job runner tick.
    pub runner_schedule: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("apify_token", &"[redacted]")
            .field("apify_base_url", &self.apify_base_url)
            .field("apify_actor_id", &self.apify_actor_id)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_run_timeout_secs", &self.scraper_run_timeout_secs)
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_ms",
                &self.scraper_retry_backoff_base_ms,
            )
            .field(
                "scraper_inter_call_delay_ms",
                &self.scraper_inter_call_delay_ms,
            )
            .field("scraper_reels_per_account", &self.scraper_reels_per_account)
            .field("scraper_accounts_per_call", &self.scraper_accounts_per_call)
            .field("job_default_batch_size", &self.job_default_batch_size)
            .field("job_min_batch_size", &self.job_min_batch_size)
            .field("job_max_batch_size", &self.job_max_batch_size)
            .field("job_time_budget_secs", &self.job_time_budget_secs)
            .field("runner_loop_budget_secs", &self.runner_loop_budget_secs)
            .field("runner_max_loops", &self.runner_max_loops)
            .field("scrape_schedule", &self.scrape_schedule)
            .field("runner_schedule", &self.runner_schedule)
            .finish()
    }
}
