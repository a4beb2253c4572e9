// ABOUTME: Typed configuration for scrape requests: ContentKind, common options, per-kind extras.
// ABOUTME: ScrapeRequest validates its URL at construction; unknown option keys are ignored on deserialization.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ScrapeError;

/// The category of page a scrape request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    News,
    Ecommerce,
    #[serde(rename = "techdocs")]
    TechDocs,
    #[default]
    Generic,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::News => "news",
            ContentKind::Ecommerce => "ecommerce",
            ContentKind::TechDocs => "techdocs",
            ContentKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "news" => Ok(ContentKind::News),
            "ecommerce" => Ok(ContentKind::Ecommerce),
            "techdocs" => Ok(ContentKind::TechDocs),
            "generic" => Ok(ContentKind::Generic),
            other => Err(ScrapeError::validation(
                "",
                "ParseContentKind",
                Some(anyhow::anyhow!("unknown content type: {}", other)),
            )),
        }
    }
}

/// Page readiness state to wait for during navigation.
///
/// The HTTP provider treats every variant as fetch-complete; a headless
/// backend maps them to real readiness events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WaitUntil {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    #[default]
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

/// Upstream proxy configuration for navigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Options recognized by every content type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonOptions {
    /// Whole-scrape deadline in milliseconds.
    pub timeout: u64,
    pub wait_until: WaitUntil,
    pub cache_enabled: bool,
    /// Cache TTL in seconds.
    pub cache_ttl: u64,
    pub rate_limit: bool,
    /// Additional navigation attempts after the first failure.
    pub max_retries: u32,
    pub user_agent: Option<String>,
    pub proxy: Option<ProxyConfig>,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            timeout: 30_000,
            wait_until: WaitUntil::default(),
            cache_enabled: true,
            cache_ttl: 3_600,
            rate_limit: true,
            max_retries: 3,
            user_agent: None,
            proxy: None,
        }
    }
}

/// Extras computed for news pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsOptions {
    pub include_images: bool,
    pub include_links: bool,
}

impl Default for NewsOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_links: false,
        }
    }
}

/// Extras computed for product pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EcommerceOptions {
    pub include_images: bool,
    pub include_specifications: bool,
    pub include_variants: bool,
    pub include_reviews: bool,
    pub include_related: bool,
}

impl Default for EcommerceOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            include_specifications: true,
            include_variants: true,
            include_reviews: true,
            include_related: false,
        }
    }
}

/// Structural extras computed for technical documentation pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TechDocsOptions {
    pub include_toc: bool,
    pub include_headings: bool,
    pub include_code: bool,
    pub include_links: bool,
}

impl Default for TechDocsOptions {
    fn default() -> Self {
        Self {
            include_toc: true,
            include_headings: true,
            include_code: true,
            include_links: true,
        }
    }
}

impl TechDocsOptions {
    /// All structural extraction disabled; this is what `generic` runs with.
    pub fn structural_disabled() -> Self {
        Self {
            include_toc: false,
            include_headings: false,
            include_code: false,
            include_links: false,
        }
    }
}

/// The full option set for one scrape request: common knobs plus per-kind
/// extras. Only the extras matching the request's `ContentKind` are read.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeOptions {
    #[serde(flatten)]
    pub common: CommonOptions,
    pub news: NewsOptions,
    pub ecommerce: EcommerceOptions,
    pub techdocs: TechDocsOptions,
}

impl ScrapeOptions {
    /// Flatten the options into sorted parameters for cache-key derivation.
    ///
    /// A `BTreeMap` guarantees the same logical options hash identically
    /// regardless of construction order.
    pub fn cache_params(&self) -> BTreeMap<String, serde_json::Value> {
        let mut params = BTreeMap::new();
        if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(self) {
            for (key, value) in map {
                // Knobs that shape the request, not the extracted output,
                // are excluded so toggling them does not fork the cache.
                if key == "cacheEnabled" || key == "cacheTtl" || key == "rateLimit" {
                    continue;
                }
                params.insert(key, value);
            }
        }
        params
    }
}

/// A validated, immutable scrape request.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    url: Url,
    domain: String,
    pub kind: ContentKind,
    pub options: ScrapeOptions,
}

impl ScrapeRequest {
    /// Construct a request, validating that `url` is an absolute http(s) URL
    /// with a host.
    pub fn new(url: &str, kind: ContentKind, options: ScrapeOptions) -> Result<Self, ScrapeError> {
        if url.is_empty() {
            return Err(ScrapeError::validation(url, "ScrapeRequest", None));
        }
        let parsed = Url::parse(url).map_err(|e| {
            ScrapeError::validation(
                url,
                "ScrapeRequest",
                Some(anyhow::anyhow!("malformed URL: {}", e)),
            )
        })?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ScrapeError::validation(
                url,
                "ScrapeRequest",
                Some(anyhow::anyhow!("scheme must be http or https")),
            ));
        }
        let domain = parsed
            .host_str()
            .map(|h| h.to_lowercase())
            .ok_or_else(|| {
                ScrapeError::validation(
                    url,
                    "ScrapeRequest",
                    Some(anyhow::anyhow!("URL has no host")),
                )
            })?;
        Ok(Self {
            url: parsed,
            domain,
            kind,
            options,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Lowercased hostname, used as the rate-limit key.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn common_defaults_match_documented_values() {
        let opts = CommonOptions::default();
        assert_eq!(opts.timeout, 30_000);
        assert_eq!(opts.wait_until, WaitUntil::NetworkIdle2);
        assert!(opts.cache_enabled);
        assert_eq!(opts.cache_ttl, 3_600);
        assert!(opts.rate_limit);
        assert_eq!(opts.max_retries, 3);
        assert!(opts.user_agent.is_none());
        assert!(opts.proxy.is_none());
    }

    #[test]
    fn unknown_option_keys_are_ignored() {
        let json = r#"{"timeout": 5000, "someFutureKnob": true, "nested": {"x": 1}}"#;
        let opts: ScrapeOptions = serde_json::from_str(json).expect("deserialize");
        assert_eq!(opts.common.timeout, 5_000);
        // Everything else keeps its default.
        assert!(opts.common.cache_enabled);
    }

    #[test]
    fn wait_until_deserializes_wire_names() {
        let w: WaitUntil = serde_json::from_str("\"domcontentloaded\"").unwrap();
        assert_eq!(w, WaitUntil::DomContentLoaded);
        let w: WaitUntil = serde_json::from_str("\"networkidle0\"").unwrap();
        assert_eq!(w, WaitUntil::NetworkIdle0);
    }

    #[test]
    fn request_rejects_malformed_url() {
        let err = ScrapeRequest::new("not a url", ContentKind::News, ScrapeOptions::default())
            .expect_err("should fail");
        assert!(err.is_validation());
    }

    #[test]
    fn request_rejects_non_http_scheme() {
        let err = ScrapeRequest::new(
            "ftp://example.com/file",
            ContentKind::Generic,
            ScrapeOptions::default(),
        )
        .expect_err("should fail");
        assert!(err.is_validation());
    }

    #[test]
    fn request_extracts_lowercase_domain() {
        let req = ScrapeRequest::new(
            "https://Shop.Example.COM/item/1",
            ContentKind::Ecommerce,
            ScrapeOptions::default(),
        )
        .expect("valid request");
        assert_eq!(req.domain(), "shop.example.com");
    }

    #[test]
    fn content_kind_roundtrips_from_str() {
        assert_eq!("news".parse::<ContentKind>().unwrap(), ContentKind::News);
        assert_eq!(
            "techdocs".parse::<ContentKind>().unwrap(),
            ContentKind::TechDocs
        );
        assert!("video".parse::<ContentKind>().is_err());
    }

    #[test]
    fn cache_params_exclude_request_shaping_knobs() {
        let opts = ScrapeOptions::default();
        let params = opts.cache_params();
        assert!(!params.contains_key("cacheEnabled"));
        assert!(!params.contains_key("cacheTtl"));
        assert!(!params.contains_key("rateLimit"));
        assert!(params.contains_key("timeout"));
        assert!(params.contains_key("news"));
    }

    #[test]
    fn generic_runs_with_structural_extras_disabled() {
        let t = TechDocsOptions::structural_disabled();
        assert!(!t.include_toc && !t.include_headings && !t.include_code && !t.include_links);
    }
}
