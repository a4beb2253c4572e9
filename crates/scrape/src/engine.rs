// ABOUTME: The scrape pipeline: rate limit, cache lookup, fetch with retries under a deadline,
// ABOUTME: extract per content type, render markdown/text, cache the record.

//! The scraping engine.
//!
//! [`Scraper`] owns the page provider, the cache store, and the per-domain
//! rate limiter, and runs every request through the same pipeline:
//!
//! 1. admit against the domain's rate-limit window
//! 2. look the request up in the cache
//! 3. on a miss, fetch (with retries) and extract under the deadline
//! 4. write the record through to the cache
//!
//! Cache and rate-limit store failures degrade to cache-miss / admit; only
//! fetch and validation failures surface as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::cache::{cache_get, cache_key, cache_set, KeyValueStore, MemoryStore};
use crate::error::ScrapeError;
use crate::extract::{
    extract_ecommerce, extract_generic, extract_news, extract_techdocs, Extraction,
};
use crate::limits::{with_retry, with_timeout};
use crate::markdown::{html_to_markdown, html_to_text, sanitize_html};
use crate::options::{ContentKind, ScrapeRequest};
use crate::profiles;
use crate::ratelimit::RateLimiter;
use crate::result::{word_count, ScrapeRecord};
use crate::session::{BrowserProvider, HttpBrowser, NavOptions, Page};

/// A scrape result plus pipeline bookkeeping. `cached` is carried here and
/// not inside the record so cached and fresh payloads stay byte-identical.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub record: ScrapeRecord,
    pub cached: bool,
    pub processing_ms: u64,
}

pub struct Scraper {
    provider: Arc<dyn BrowserProvider>,
    store: Arc<dyn KeyValueStore>,
    limiter: RateLimiter,
}

pub struct ScraperBuilder {
    provider: Option<Arc<dyn BrowserProvider>>,
    store: Option<Arc<dyn KeyValueStore>>,
    max_requests: u32,
    window: Duration,
}

impl ScraperBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            store: None,
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn BrowserProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the default 60-requests-per-minute domain policy.
    pub fn rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.max_requests = max_requests;
        self.window = window;
        self
    }

    pub fn build(self) -> Scraper {
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(HttpBrowser::new()));
        let store: Arc<dyn KeyValueStore> =
            self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let limiter = RateLimiter::new(store.clone(), self.max_requests, self.window);
        Scraper {
            provider,
            store,
            limiter,
        }
    }
}

impl Default for ScraperBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Scraper {
    pub fn builder() -> ScraperBuilder {
        ScraperBuilder::new()
    }

    /// Run one request through the pipeline.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome, ScrapeError> {
        let started = Instant::now();
        let url = request.url().as_str();

        if request.options.common.rate_limit {
            let decision = self.limiter.admit(request.domain()).await;
            if !decision.allowed {
                tracing::warn!(
                    domain = request.domain(),
                    reset_in_secs = decision.reset_in_secs,
                    "rate limit exceeded"
                );
                return Err(ScrapeError::rate_limited(
                    url,
                    "Scrape",
                    decision.reset_in_secs,
                ));
            }
        }

        let mut params = request.options.cache_params();
        params.insert("contentType".to_string(), json!(request.kind.as_str()));
        let key = cache_key("scrape", url, &params);

        if request.options.common.cache_enabled {
            if let Some(hit) = cache_get(self.store.as_ref(), &key).await {
                match serde_json::from_str::<ScrapeRecord>(&hit) {
                    Ok(record) => {
                        tracing::debug!(url, "cache hit");
                        return Ok(ScrapeOutcome {
                            record,
                            cached: true,
                            processing_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    Err(err) => {
                        tracing::debug!(url, error = %err, "cached record unreadable, refetching");
                    }
                }
            }
        }

        let deadline = Duration::from_millis(request.options.common.timeout);
        let record = with_timeout(self.produce(request), deadline, url, "Scrape").await?;

        if request.options.common.cache_enabled {
            if let Ok(serialized) = serde_json::to_string(&record) {
                let ttl = Duration::from_secs(request.options.common.cache_ttl);
                cache_set(self.store.as_ref(), &key, &serialized, ttl).await;
            }
        }

        Ok(ScrapeOutcome {
            record,
            cached: false,
            processing_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Fetch and extract, without the deadline or cache shell.
    async fn produce(&self, request: &ScrapeRequest) -> Result<ScrapeRecord, ScrapeError> {
        let nav = NavOptions {
            wait_until: request.options.common.wait_until,
            user_agent: request.options.common.user_agent.clone(),
            headers: Default::default(),
        };

        let page = with_retry(request.options.common.max_retries, || {
            self.provider.open(request.url(), &nav)
        })
        .await?;

        let extraction = match request.kind {
            ContentKind::News => extract_news(&page, &request.options.news),
            ContentKind::Ecommerce => extract_ecommerce(&page, &request.options.ecommerce),
            ContentKind::TechDocs => extract_techdocs(&page, &request.options.techdocs),
            ContentKind::Generic => extract_generic(&page),
        };

        Ok(assemble_record(request, &page, extraction))
    }
}

fn assemble_record(request: &ScrapeRequest, page: &Page, extraction: Extraction) -> ScrapeRecord {
    let clean_html = sanitize_html(&extraction.content_html);
    let markdown = html_to_markdown(&clean_html);
    let content = html_to_text(&clean_html);

    let mut metadata = Map::new();
    metadata.insert(
        "contentType".to_string(),
        json!(request.kind.as_str()),
    );
    metadata.insert("finalUrl".to_string(), json!(page.final_url()));
    metadata.insert("statusCode".to_string(), json!(page.status()));
    metadata.insert("wordCount".to_string(), json!(word_count(&content)));
    if let Some(description) = profiles::COMMON.description.resolve(page) {
        metadata.insert("description".to_string(), Value::String(description));
    }
    if let Some(keywords) = page.meta_content("keywords") {
        metadata.insert("keywords".to_string(), Value::String(keywords));
    }
    if let Some(language) = page.query_attr("html", "lang") {
        metadata.insert("language".to_string(), Value::String(language));
    }
    if let Some(site_name) = page.meta_content("og:site_name") {
        metadata.insert("siteName".to_string(), Value::String(site_name));
    }
    if let Some(canonical) = page
        .query_attr("link[rel='canonical']", "href")
        .and_then(|href| page.resolve_href(&href))
    {
        metadata.insert("canonical".to_string(), Value::String(canonical));
    }
    if let Some(favicon) = page
        .query_attr("link[rel~='icon']", "href")
        .and_then(|href| page.resolve_href(&href))
    {
        metadata.insert("favicon".to_string(), Value::String(favicon));
    }

    ScrapeRecord {
        url: request.url().to_string(),
        title: extraction.title,
        content,
        html: Some(clean_html),
        markdown: Some(markdown),
        metadata,
        timestamp: Utc::now(),
        fields: extraction.fields,
    }
}

/// Extract a record from HTML already in hand, bypassing fetch, cache, and
/// rate limiting. Used for offline extraction from a saved page.
pub fn scrape_html(html: &str, request: &ScrapeRequest) -> ScrapeRecord {
    let page = Page::from_html(html, request.url().clone());
    let extraction = match request.kind {
        ContentKind::News => extract_news(&page, &request.options.news),
        ContentKind::Ecommerce => extract_ecommerce(&page, &request.options.ecommerce),
        ContentKind::TechDocs => extract_techdocs(&page, &request.options.techdocs),
        ContentKind::Generic => extract_generic(&page),
    };
    assemble_record(request, &page, extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ScrapeOptions;
    use crate::result::TypedFields;
    use pretty_assertions::assert_eq;

    const ARTICLE_HTML: &str = r#"
        <html lang="en"><head>
            <title>Fallback</title>
            <meta name="description" content="What happened today">
            <meta name="keywords" content="news, events">
        </head><body>
            <article>
                <h1 itemprop="headline">Today's Story</h1>
                <span class="byline">Alex Writer</span>
                <div itemprop="articleBody"><p>It was a day.</p></div>
            </article>
        </body></html>
    "#;

    fn news_request(url: &str) -> ScrapeRequest {
        ScrapeRequest::new(url, ContentKind::News, ScrapeOptions::default()).unwrap()
    }

    #[test]
    fn scrape_html_extracts_offline() {
        let request = news_request("https://example.com/story");
        let record = scrape_html(ARTICLE_HTML, &request);

        assert_eq!(record.title, "Today's Story");
        assert_eq!(record.content, "It was a day.");
        assert!(record.markdown.as_deref().unwrap().contains("It was a day."));
        assert_eq!(record.metadata["contentType"], json!("news"));
        assert_eq!(record.metadata["wordCount"], json!(4));
        assert_eq!(record.metadata["description"], json!("What happened today"));
        assert_eq!(record.metadata["language"], json!("en"));
        assert!(matches!(record.fields, TypedFields::News(_)));
    }

    #[test]
    fn record_html_is_sanitized() {
        let html = r#"<html><body><article><h1>T</h1>
            <div itemprop="articleBody"><p>ok</p><script>alert(1)</script></div>
        </article></body></html>"#;
        let request = news_request("https://example.com/story");
        let record = scrape_html(html, &request);
        assert!(!record.html.as_deref().unwrap().contains("script"));
        assert!(record.html.as_deref().unwrap().contains("<p>ok</p>"));
    }
}
