use async_trait::async_trait;

use crate::error::ScraperError;

/// One untyped record as returned by the scraping API.
///
/// The upstream actor has shipped several record shapes over time, so items
/// stay as JSON until [`crate::aliases`] resolves their fields.
pub type RawScrapeItem = serde_json::Value;

/// Anything that can fetch raw post records for a set of account handles.
#[async_trait]
pub trait ScrapeSource: Send + Sync {
    /// Fetches up to `per_account_limit` recent posts for each handle.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::RateLimited`] when the upstream signals
    /// throttling, and other variants for transport or API failures.
    async fn fetch(
        &self,
        handles: &[String],
        per_account_limit: u32,
    ) -> Result<Vec<RawScrapeItem>, ScraperError>;
}

#[async_trait]
impl<S: ScrapeSource + ?Sized> ScrapeSource for std::sync::Arc<S> {
    async fn fetch(
        &self,
        handles: &[String],
        per_account_limit: u32,
    ) -> Result<Vec<RawScrapeItem>, ScraperError> {
        (**self).fetch(handles, per_account_limit).await
    }
}
