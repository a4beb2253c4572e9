// ABOUTME: Error types for the Dredge scraping pipeline: ErrorKind taxonomy and ScrapeError struct.
// ABOUTME: Provides categorized errors with status-code mapping, constructors, and heuristic classification.

use std::fmt;

/// Error kinds representing the closed failure taxonomy of a scrape operation.
///
/// Every kind carries a fixed HTTP-equivalent status code so a routing layer
/// can turn any `ScrapeError` into a response without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    RateLimit,
    Timeout,
    Scraping,
    Network,
    Browser,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::RateLimit => 429,
            ErrorKind::Timeout => 408,
            ErrorKind::Scraping => 500,
            ErrorKind::Network => 503,
            ErrorKind::Browser => 500,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::RateLimit => "rate limit exceeded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Scraping => "scraping error",
            ErrorKind::Network => "network error",
            ErrorKind::Browser => "browser error",
            ErrorKind::NotFound => "not found",
            ErrorKind::Internal => "internal error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for scrape operations.
#[derive(Debug, thiserror::Error)]
pub struct ScrapeError {
    pub kind: ErrorKind,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
    /// Optional structured details (e.g. rate-limit reset seconds).
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dredge: {} {}: {}", self.op, self.url, self.kind)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    /// Message safe to put on the wire: kind, operation, and URL only.
    /// The source chain stays in [`Display`](fmt::Display) and logs.
    pub fn client_message(&self) -> String {
        format!("{} {}: {}", self.op, self.url, self.kind)
    }

    fn with_kind(
        kind: ErrorKind,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            op: op.into(),
            source,
            details: None,
        }
    }

    /// Create a Validation error.
    pub fn validation(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_kind(ErrorKind::Validation, url, op, source)
    }

    /// Create a RateLimit error carrying the seconds until the window resets.
    pub fn rate_limited(
        url: impl Into<String>,
        op: impl Into<String>,
        reset_in_secs: u64,
    ) -> Self {
        let mut err = Self::with_kind(
            ErrorKind::RateLimit,
            url,
            op,
            Some(anyhow::anyhow!("retry in {}s", reset_in_secs)),
        );
        err.details = Some(serde_json::json!({ "resetInSeconds": reset_in_secs }));
        err
    }

    /// Create a Timeout error for an operation that exceeded its deadline.
    pub fn timeout(url: impl Into<String>, op: impl Into<String>, millis: u128) -> Self {
        Self::with_kind(
            ErrorKind::Timeout,
            url,
            op,
            Some(anyhow::anyhow!("exceeded deadline of {}ms", millis)),
        )
    }

    /// Create a Scraping error.
    pub fn scraping(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_kind(ErrorKind::Scraping, url, op, source)
    }

    /// Create a Network error.
    pub fn network(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_kind(ErrorKind::Network, url, op, source)
    }

    /// Create a Browser error.
    pub fn browser(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_kind(ErrorKind::Browser, url, op, source)
    }

    /// Create a NotFound error.
    pub fn not_found(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_kind(ErrorKind::NotFound, url, op, source)
    }

    /// Create an Internal error.
    pub fn internal(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_kind(ErrorKind::Internal, url, op, source)
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Returns true if this is a RateLimit error.
    pub fn is_rate_limit(&self) -> bool {
        self.kind == ErrorKind::RateLimit
    }

    /// Returns true if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// Returns true if this is a Network error.
    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// Returns true if this is a Browser error.
    pub fn is_browser(&self) -> bool {
        self.kind == ErrorKind::Browser
    }

    /// Returns true if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// HTTP-equivalent status code of this error.
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

/// Classify an arbitrary failure into the scrape taxonomy.
///
/// A `ScrapeError` passes through unchanged. Anything else is pattern-matched
/// on its message text as a last resort; typed errors raised at each failure
/// site are the primary classification path.
pub fn classify(err: anyhow::Error, url: &str, op: &str) -> ScrapeError {
    let err = match err.downcast::<ScrapeError>() {
        Ok(scrape_err) => return scrape_err,
        Err(other) => other,
    };

    let message = err.to_string().to_lowercase();
    let kind = if message.contains("timeout") || message.contains("timed out") {
        ErrorKind::Timeout
    } else if message.contains("net::") || message.contains("network") {
        ErrorKind::Network
    } else if message.contains("browser")
        || message.contains("chrome")
        || message.contains("chromium")
    {
        ErrorKind::Browser
    } else {
        ErrorKind::Internal
    };

    ScrapeError {
        kind,
        url: url.to_string(),
        op: op.to_string(),
        source: Some(err),
        details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ErrorKind::Validation.status_code(), 400);
        assert_eq!(ErrorKind::RateLimit.status_code(), 429);
        assert_eq!(ErrorKind::Timeout.status_code(), 408);
        assert_eq!(ErrorKind::Scraping.status_code(), 500);
        assert_eq!(ErrorKind::Network.status_code(), 503);
        assert_eq!(ErrorKind::Browser.status_code(), 500);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn classify_passes_through_typed_errors() {
        let original = ScrapeError::rate_limited("https://example.com", "Scrape", 30);
        let classified = classify(anyhow::Error::new(original), "https://other.com", "Other");
        assert!(classified.is_rate_limit());
        // The original error's context wins over the classification site.
        assert_eq!(classified.url, "https://example.com");
    }

    #[test]
    fn classify_matches_timeout_text() {
        let err = anyhow::anyhow!("navigation timed out after 30s");
        let classified = classify(err, "https://example.com", "Scrape");
        assert!(classified.is_timeout());
    }

    #[test]
    fn classify_matches_network_text() {
        let err = anyhow::anyhow!("net::ERR_CONNECTION_REFUSED");
        let classified = classify(err, "https://example.com", "Scrape");
        assert!(classified.is_network());
    }

    #[test]
    fn classify_matches_browser_text() {
        let err = anyhow::anyhow!("chromium render process crashed");
        let classified = classify(err, "https://example.com", "Scrape");
        assert!(classified.is_browser());
    }

    #[test]
    fn classify_defaults_to_internal() {
        let err = anyhow::anyhow!("something unexpected");
        let classified = classify(err, "https://example.com", "Scrape");
        assert_eq!(classified.kind, ErrorKind::Internal);
    }

    #[test]
    fn rate_limited_carries_reset_details() {
        let err = ScrapeError::rate_limited("https://example.com", "Scrape", 42);
        let details = err.details.expect("details should be set");
        assert_eq!(details["resetInSeconds"], 42);
    }

    #[test]
    fn display_includes_op_url_and_kind() {
        let err = ScrapeError::timeout("https://example.com/x", "Scrape", 100);
        let rendered = err.to_string();
        assert!(rendered.contains("Scrape"));
        assert!(rendered.contains("https://example.com/x"));
        assert!(rendered.contains("timeout"));
    }
}
