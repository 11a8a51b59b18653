pub mod adapter;
pub mod aliases;
pub mod client;
pub mod error;
pub mod normalize;
pub mod rate_limit;
pub mod source;

pub use adapter::{ReelScraper, ScrapeResult, ScraperSettings, ViewHistory};
pub use client::{ApifyClient, ApifyClientConfig};
pub use error::ScraperError;
pub use source::{RawScrapeItem, ScrapeSource};
