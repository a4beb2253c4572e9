// ABOUTME: Browser session abstraction: the BrowserProvider trait, the Page DOM snapshot, and the HTTP-backed provider.
// ABOUTME: HttpBrowser fetches rendered HTML over reqwest with charset detection; a headless backend implements the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::ScrapeError;
use crate::options::WaitUntil;
use crate::selectors::cached_selector;

/// Maximum allowed page size (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Navigation parameters passed to a provider's `open`.
#[derive(Debug, Clone, Default)]
pub struct NavOptions {
    pub wait_until: WaitUntil,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
}

/// A snapshot of a navigated page: parsed DOM plus navigation metadata.
///
/// Dropping the page releases the session; the scrape pipeline keeps it
/// scoped to a single producer invocation so release happens on every exit
/// path (success, classified error, or abandoned timeout).
#[derive(Debug)]
pub struct Page {
    doc: Html,
    url: Url,
    final_url: String,
    status: u16,
}

impl Page {
    /// Build a page from an HTML string and the URL it was loaded from.
    pub fn from_html(html: &str, url: Url) -> Self {
        let final_url = url.to_string();
        Self {
            doc: Html::parse_document(html),
            url,
            final_url,
            status: 200,
        }
    }

    fn with_navigation(html: &str, url: Url, final_url: String, status: u16) -> Self {
        Self {
            doc: Html::parse_document(html),
            url,
            final_url,
            status,
        }
    }

    /// The URL the page content should be resolved against.
    pub fn base_url(&self) -> &Url {
        &self.url
    }

    /// The URL after redirects.
    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Lowercased hostname of the page.
    pub fn host(&self) -> Option<String> {
        self.url.host_str().map(|h| h.to_lowercase())
    }

    /// Inner text of the first element matching `selector`, whitespace
    /// normalized. Invalid selectors and empty matches are both misses.
    pub fn query_text(&self, selector: &str) -> Option<String> {
        let sel = cached_selector(selector)?;
        for el in self.doc.select(&sel) {
            let text: String = el.text().collect::<Vec<_>>().join(" ");
            let normalized = normalize_whitespace(&text);
            if !normalized.is_empty() {
                return Some(normalized);
            }
        }
        None
    }

    /// Trimmed attribute value of the first matching element with a
    /// non-empty value.
    pub fn query_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let sel = cached_selector(selector)?;
        for el in self.doc.select(&sel) {
            if let Some(value) = el.value().attr(attr) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }

    /// Normalized inner text of every matching element, empty ones skipped.
    pub fn query_text_all(&self, selector: &str) -> Vec<String> {
        let Some(sel) = cached_selector(selector) else {
            return Vec::new();
        };
        self.doc
            .select(&sel)
            .filter_map(|el| {
                let text: String = el.text().collect::<Vec<_>>().join(" ");
                let normalized = normalize_whitespace(&text);
                (!normalized.is_empty()).then_some(normalized)
            })
            .collect()
    }

    /// `content` attribute of `meta[name=..]` or `meta[property=..]`.
    pub fn meta_content(&self, name: &str) -> Option<String> {
        for pattern in [
            format!("meta[name='{}']", name),
            format!("meta[property='{}']", name),
        ] {
            if let Some(value) = self.query_attr(&pattern, "content") {
                return Some(value);
            }
        }
        None
    }

    /// All elements matching `selector`.
    pub fn select(&self, selector: &str) -> Vec<ElementRef<'_>> {
        let Some(sel) = cached_selector(selector) else {
            return Vec::new();
        };
        self.doc.select(&sel).collect()
    }

    /// First element matching any of `selectors`, in declared order.
    pub fn first_matching(&self, selectors: &[&str]) -> Option<ElementRef<'_>> {
        for css in selectors {
            if let Some(sel) = cached_selector(css) {
                if let Some(el) = self.doc.select(&sel).next() {
                    return Some(el);
                }
            }
        }
        None
    }

    /// Inner HTML of the first element matching any of `selectors`.
    pub fn first_inner_html(&self, selectors: &[&str]) -> Option<String> {
        self.first_matching(selectors).map(|el| el.inner_html())
    }

    /// Inner HTML of `<body>`, or empty if the document has none.
    pub fn body_inner_html(&self) -> String {
        self.first_inner_html(&["body"]).unwrap_or_default()
    }

    /// Trimmed text of the document `<title>`, the page-level title fallback.
    pub fn document_title(&self) -> Option<String> {
        self.query_text("title")
    }

    /// Resolve a possibly relative href against the page URL.
    pub fn resolve_href(&self, href: &str) -> Option<String> {
        self.url.join(href).ok().map(|u| u.to_string())
    }
}

/// Supplies navigable pages. The default implementation fetches server-side
/// rendered HTML over HTTP; a headless-browser backend implements the same
/// contract with real navigation.
#[async_trait(?Send)]
pub trait BrowserProvider {
    /// Navigate to `url` and return the page snapshot. Raises on failure.
    async fn open(&self, url: &Url, nav: &NavOptions) -> Result<Page, ScrapeError>;
}

/// HTTP-backed page provider.
pub struct HttpBrowser {
    client: reqwest::Client,
    default_user_agent: String,
}

impl HttpBrowser {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .unwrap_or_default();
        Self {
            client,
            default_user_agent: "Dredge/1.0".to_string(),
        }
    }

    /// Use a pre-configured client (proxy, TLS, pool settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            default_user_agent: "Dredge/1.0".to_string(),
        }
    }

    /// Route all requests through an HTTP(S) proxy, with optional basic auth.
    pub fn with_proxy(config: &crate::options::ProxyConfig) -> Result<Self, ScrapeError> {
        let mut proxy = reqwest::Proxy::all(&config.url).map_err(|e| {
            ScrapeError::validation(config.url.as_str(), "Configure", Some(anyhow::anyhow!(e)))
        })?;
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            proxy = proxy.basic_auth(user, pass);
        }
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .proxy(proxy)
            .build()
            .map_err(|e| {
                ScrapeError::internal(config.url.as_str(), "Configure", Some(anyhow::anyhow!(e)))
            })?;
        Ok(Self::with_client(client))
    }
}

impl Default for HttpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl BrowserProvider for HttpBrowser {
    async fn open(&self, url: &Url, nav: &NavOptions) -> Result<Page, ScrapeError> {
        let url_s = url.as_str();
        let mut request = self.client.get(url.clone()).header(
            reqwest::header::USER_AGENT,
            nav.user_agent
                .as_deref()
                .unwrap_or(&self.default_user_agent),
        );
        for (key, value) in &nav.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::timeout(url_s, "Navigate", 0)
            } else if e.is_connect() {
                ScrapeError::network(url_s, "Navigate", Some(anyhow::anyhow!(e)))
            } else {
                ScrapeError::browser(url_s, "Navigate", Some(anyhow::anyhow!(e)))
            }
        })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ScrapeError::not_found(
                url_s,
                "Navigate",
                Some(anyhow::anyhow!("HTTP status 404")),
            ));
        }
        if !response.status().is_success() {
            return Err(ScrapeError::browser(
                url_s,
                "Navigate",
                Some(anyhow::anyhow!("HTTP status {}", status)),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_lowercase());

        let body = response.bytes().await.map_err(|e| {
            ScrapeError::network(
                url_s,
                "Navigate",
                Some(anyhow::anyhow!("failed to read body: {}", e)),
            )
        })?;
        if body.len() > MAX_CONTENT_LENGTH {
            return Err(ScrapeError::browser(
                url_s,
                "Navigate",
                Some(anyhow::anyhow!("content too large")),
            ));
        }

        let html = decode_body(&body, content_type.as_deref());
        Ok(Page::with_navigation(&html, url.clone(), final_url, status))
    }
}

/// Normalizes whitespace by collapsing runs into single spaces.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode body bytes using the charset from the content-type header, falling
/// back to detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract the charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}
