// ABOUTME: Main library entry point for the Dredge structured web scraper.
// ABOUTME: Re-exports the public API: Scraper, ScrapeRequest, ScrapeRecord, ScrapeError, content options.

//! Dredge - structured scraping of news, e-commerce, and documentation pages.
//!
//! This crate fetches rendered pages, resolves typed fields through
//! per-content-type selector chains, and produces records with clean HTML,
//! Markdown, and plain-text renditions. Results are cached and requests are
//! rate limited per domain.
//!
//! # Example
//!
//! ```no_run
//! use dredge_scrape::{ContentKind, ScrapeError, ScrapeOptions, ScrapeRequest, Scraper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ScrapeError> {
//!     let scraper = Scraper::builder().build();
//!     let request = ScrapeRequest::new(
//!         "https://example.com/article",
//!         ContentKind::News,
//!         ScrapeOptions::default(),
//!     )?;
//!     let outcome = scraper.scrape(&request).await?;
//!     println!("{}", outcome.record.markdown.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod extract;
pub mod limits;
pub mod markdown;
pub mod options;
pub mod profiles;
pub mod ratelimit;
pub mod resolve;
pub mod result;
pub mod selectors;
pub mod session;

pub use crate::cache::{KeyValueStore, MemoryStore};
pub use crate::engine::{scrape_html, ScrapeOutcome, Scraper, ScraperBuilder};
pub use crate::error::{classify, ErrorKind, ScrapeError};
pub use crate::options::{
    CommonOptions, ContentKind, EcommerceOptions, NewsOptions, ProxyConfig, ScrapeOptions,
    ScrapeRequest, TechDocsOptions, WaitUntil,
};
pub use crate::ratelimit::{Decision, RateLimiter};
pub use crate::result::{ApiEnvelope, ScrapeRecord, TypedFields};
pub use crate::session::{BrowserProvider, HttpBrowser, NavOptions, Page};
