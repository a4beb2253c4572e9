// ABOUTME: End-to-end pipeline tests against a local mock HTTP server.
// ABOUTME: Covers caching idempotence, rate limiting, timeouts, retries, and typed extraction.

use std::sync::Arc;
use std::time::Duration;

use dredge_scrape::{
    ContentKind, MemoryStore, ScrapeOptions, ScrapeRequest, Scraper, TypedFields,
};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;

const ARTICLE_HTML: &str = r#"
    <html lang="en"><head>
        <title>Fallback Title</title>
        <meta name="description" content="Short summary">
        <meta property="article:section" content="World">
    </head><body>
        <article>
            <h1 itemprop="headline">Mock Headline</h1>
            <div class="byline"><span itemprop="author"><span itemprop="name">Pat Reporter</span></span></div>
            <time datetime="2024-06-01T08:30:00Z">June 1</time>
            <div itemprop="articleBody">
                <p>Paragraph one of the story.</p>
                <img src="/photos/one.jpg" alt="scene">
            </div>
        </article>
    </body></html>
"#;

fn news_request(url: &str) -> ScrapeRequest {
    ScrapeRequest::new(url, ContentKind::News, ScrapeOptions::default())
        .expect("valid request")
}

#[tokio::test]
async fn scrape_extracts_news_end_to_end() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/story");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(ARTICLE_HTML);
    });

    let scraper = Scraper::builder().build();
    let outcome = scraper
        .scrape(&news_request(&server.url("/story")))
        .await
        .expect("scrape should succeed");

    assert!(!outcome.cached);
    let record = outcome.record;
    assert_eq!(record.title, "Mock Headline");
    assert!(record.content.contains("Paragraph one of the story."));
    assert!(record
        .markdown
        .as_deref()
        .unwrap()
        .contains("Paragraph one of the story."));
    assert_eq!(record.metadata["contentType"], serde_json::json!("news"));

    let TypedFields::News(fields) = record.fields else {
        panic!("expected news fields");
    };
    assert_eq!(fields.authors, vec!["Pat Reporter"]);
    assert_eq!(fields.category.as_deref(), Some("World"));
    assert_eq!(fields.images.len(), 1);
    assert!(fields.images[0].ends_with("/photos/one.jpg"));
}

#[tokio::test]
async fn second_scrape_is_served_from_cache() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/cached");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML);
    });

    let scraper = Scraper::builder().build();
    let request = news_request(&server.url("/cached"));

    let first = scraper.scrape(&request).await.expect("first scrape");
    let second = scraper.scrape(&request).await.expect("second scrape");

    assert_eq!(mock.hits(), 1, "second request must not refetch");
    assert!(!first.cached);
    assert!(second.cached);
    // The cached payload is byte-identical to the fresh one.
    assert_eq!(
        serde_json::to_string(&first.record).unwrap(),
        serde_json::to_string(&second.record).unwrap()
    );
}

#[tokio::test]
async fn disabling_the_cache_refetches() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/fresh");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML);
    });

    let mut options = ScrapeOptions::default();
    options.common.cache_enabled = false;
    let request = ScrapeRequest::new(&server.url("/fresh"), ContentKind::News, options)
        .expect("valid request");

    let scraper = Scraper::builder().build();
    scraper.scrape(&request).await.expect("first scrape");
    scraper.scrape(&request).await.expect("second scrape");

    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn different_options_get_different_cache_entries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/opts");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML);
    });

    let scraper = Scraper::builder().build();

    let a = news_request(&server.url("/opts"));
    let mut options = ScrapeOptions::default();
    options.news.include_links = true;
    let b = ScrapeRequest::new(&server.url("/opts"), ContentKind::News, options)
        .expect("valid request");

    scraper.scrape(&a).await.expect("first scrape");
    let second = scraper.scrape(&b).await.expect("second scrape");

    assert_eq!(mock.hits(), 2, "option changes must not share cache entries");
    assert!(!second.cached);
}

#[tokio::test]
async fn rate_limit_rejects_with_429_kind() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/limited");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML);
    });

    let scraper = Scraper::builder()
        .rate_limit(1, Duration::from_secs(60))
        .build();

    // Cache is disabled so the second request actually reaches the limiter
    // with a fresh fetch ahead of it.
    let mut options = ScrapeOptions::default();
    options.common.cache_enabled = false;
    let request = ScrapeRequest::new(&server.url("/limited"), ContentKind::News, options)
        .expect("valid request");

    scraper.scrape(&request).await.expect("first is admitted");
    let err = scraper
        .scrape(&request)
        .await
        .expect_err("second must be rejected");

    assert!(err.is_rate_limit());
    assert_eq!(err.status_code(), 429);
}

#[tokio::test]
async fn rate_limit_can_be_disabled_per_request() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/unlimited");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML);
    });

    let scraper = Scraper::builder()
        .rate_limit(1, Duration::from_secs(60))
        .build();

    let mut options = ScrapeOptions::default();
    options.common.cache_enabled = false;
    options.common.rate_limit = false;
    let request = ScrapeRequest::new(&server.url("/unlimited"), ContentKind::News, options)
        .expect("valid request");

    scraper.scrape(&request).await.expect("first scrape");
    scraper.scrape(&request).await.expect("second scrape");
}

#[tokio::test]
async fn slow_origin_times_out() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML)
            .delay(Duration::from_millis(2000));
    });

    let mut options = ScrapeOptions::default();
    options.common.timeout = 200;
    options.common.max_retries = 0;
    let request = ScrapeRequest::new(&server.url("/slow"), ContentKind::News, options)
        .expect("valid request");

    let scraper = Scraper::builder().build();
    let err = scraper.scrape(&request).await.expect_err("must time out");

    assert!(err.is_timeout());
    assert_eq!(err.status_code(), 408);
}

#[tokio::test]
async fn ecommerce_scrape_returns_product_fields() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/product");
        then.status(200).header("content-type", "text/html").body(
            r#"<html><body>
                <h1 itemprop="name">Widget</h1>
                <span itemprop="price">€24.50</span>
                <span itemprop="ratingValue">4.2</span>
                <div itemprop="description">A fine widget.</div>
            </body></html>"#,
        );
    });

    let request = ScrapeRequest::new(
        &server.url("/product"),
        ContentKind::Ecommerce,
        ScrapeOptions::default(),
    )
    .expect("valid request");

    let scraper = Scraper::builder().build();
    let outcome = scraper.scrape(&request).await.expect("scrape");

    let TypedFields::Product(fields) = outcome.record.fields else {
        panic!("expected product fields");
    };
    assert_eq!(fields.price.as_deref(), Some("€24.50"));
    assert_eq!(fields.currency.as_deref(), Some("€"));
    assert_eq!(fields.rating, Some(4.2));
}

#[tokio::test]
async fn missing_page_maps_to_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/gone");
        then.status(404).body("nope");
    });

    let mut options = ScrapeOptions::default();
    options.common.max_retries = 0;
    let request = ScrapeRequest::new(&server.url("/gone"), ContentKind::Generic, options)
        .expect("valid request");

    let scraper = Scraper::builder().build();
    let err = scraper.scrape(&request).await.expect_err("must fail");

    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn shared_store_shares_cache_between_scrapers() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/shared");
        then.status(200)
            .header("content-type", "text/html")
            .body(ARTICLE_HTML);
    });

    let store = Arc::new(MemoryStore::new());
    let first_scraper = Scraper::builder().store(store.clone()).build();
    let second_scraper = Scraper::builder().store(store).build();

    let request = news_request(&server.url("/shared"));
    first_scraper.scrape(&request).await.expect("first");
    let outcome = second_scraper.scrape(&request).await.expect("second");

    assert_eq!(mock.hits(), 1);
    assert!(outcome.cached);
}
