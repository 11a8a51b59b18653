use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_APIFY_BASE_URL: &str = "https://api.apify.com/v2";
const DEFAULT_APIFY_ACTOR_ID: &str = "apify~instagram-reel-scraper";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real process environment so it can be tested with a
/// plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::str::FromStr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    }

    let parse_u32 =
        |var: &str, default: &str| -> Result<u32, ConfigError> { parse_as(var, &or_default(var, default)) };
    let parse_u64 =
        |var: &str, default: &str| -> Result<u64, ConfigError> { parse_as(var, &or_default(var, default)) };
    let parse_i32 =
        |var: &str, default: &str| -> Result<i32, ConfigError> { parse_as(var, &or_default(var, default)) };
    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_as(var, &or_default(var, default))
    };

    let database_url = require("DATABASE_URL")?;
    let apify_token = require("APIFY_TOKEN")?;

    let env = parse_environment(&or_default("VIRALREELS_ENV", "development"));
    let bind_addr: SocketAddr = parse_as(
        "VIRALREELS_BIND_ADDR",
        &or_default("VIRALREELS_BIND_ADDR", "0.0.0.0:3000"),
    )?;
    let log_level = or_default("VIRALREELS_LOG_LEVEL", "info");

    let apify_base_url = or_default("VIRALREELS_APIFY_BASE_URL", DEFAULT_APIFY_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    let apify_actor_id = or_default("VIRALREELS_APIFY_ACTOR_ID", DEFAULT_APIFY_ACTOR_ID);

    let db_max_connections = parse_u32("VIRALREELS_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("VIRALREELS_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("VIRALREELS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("VIRALREELS_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_run_timeout_secs = parse_u64("VIRALREELS_SCRAPER_RUN_TIMEOUT_SECS", "240")?;
    let scraper_max_retries = parse_u32("VIRALREELS_SCRAPER_MAX_RETRIES", "2")?;
    let scraper_retry_backoff_base_ms =
        parse_u64("VIRALREELS_SCRAPER_RETRY_BACKOFF_BASE_MS", "2000")?;
    let scraper_inter_call_delay_ms = parse_u64("VIRALREELS_SCRAPER_INTER_CALL_DELAY_MS", "2000")?;
    let scraper_reels_per_account = parse_u32("VIRALREELS_SCRAPER_REELS_PER_ACCOUNT", "5")?;
    let scraper_accounts_per_call = parse_usize("VIRALREELS_SCRAPER_ACCOUNTS_PER_CALL", "5")?;

    let job_default_batch_size = parse_i32("VIRALREELS_JOB_DEFAULT_BATCH_SIZE", "4")?;
    let job_min_batch_size = parse_i32("VIRALREELS_JOB_MIN_BATCH_SIZE", "1")?;
    let job_max_batch_size = parse_i32("VIRALREELS_JOB_MAX_BATCH_SIZE", "20")?;
    if job_min_batch_size < 1 || job_max_batch_size < job_min_batch_size {
        return Err(ConfigError::InvalidEnvVar {
            var: "VIRALREELS_JOB_MAX_BATCH_SIZE".to_string(),
            reason: format!(
                "batch size bounds must satisfy 1 <= min ({job_min_batch_size}) <= max ({job_max_batch_size})"
            ),
        });
    }
    let job_time_budget_secs = parse_u64("VIRALREELS_JOB_TIME_BUDGET_SECS", "500")?;
    let runner_loop_budget_secs = parse_u64("VIRALREELS_RUNNER_LOOP_BUDGET_SECS", "500")?;
    let runner_max_loops = parse_u32("VIRALREELS_RUNNER_MAX_LOOPS", "100")?;

    let scrape_schedule = or_default("VIRALREELS_SCRAPE_SCHEDULE", "0 0 8 * * *");
    let runner_schedule = or_default("VIRALREELS_RUNNER_SCHEDULE", "0 */5 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        apify_token,
        apify_base_url,
        apify_actor_id,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_run_timeout_secs,
        scraper_max_retries,
        scraper_retry_backoff_base_ms,
        scraper_inter_call_delay_ms,
        scraper_reels_per_account,
        scraper_accounts_per_call,
        job_default_batch_size,
        job_min_batch_size,
        job_max_batch_size,
        job_time_budget_secs,
        runner_loop_budget_secs,
        runner_max_loops,
        scrape_schedule,
        runner_schedule,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
