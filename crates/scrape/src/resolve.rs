// ABOUTME: Multi-strategy field resolution: ordered selector chains folded over a page, first non-empty match wins.
// ABOUTME: Includes numeric post-processing helpers and container-scoped link collection.

//! The field resolver engine.
//!
//! A logical field (title, price, author list, ...) is described by a
//! [`FieldSpec`]: an ordered list of extraction strategies. Strategies are
//! tried in declared order and any per-strategy failure (invalid selector,
//! no match, empty text) is a silent miss, never an error. The priority
//! order in each profile encodes which markup patterns are most reliable
//! across real sites: semantic HTML5/microdata first, utility classes last,
//! meta tags as final fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::selectors::cached_selector;
use crate::session::Page;

/// One extraction strategy inside a field's selector chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Inner text of a CSS selector match.
    Text { selector: String },
    /// Attribute value of a CSS selector match.
    Attr { selector: String, attr: String },
    /// `content` of a `meta[name=..]` / `meta[property=..]` tag.
    Meta { name: String },
}

/// Shorthand for a text strategy.
pub fn text(selector: &str) -> Strategy {
    Strategy::Text {
        selector: selector.to_string(),
    }
}

/// Shorthand for an attribute strategy.
pub fn attr(selector: &str, attr: &str) -> Strategy {
    Strategy::Attr {
        selector: selector.to_string(),
        attr: attr.to_string(),
    }
}

/// Shorthand for a meta-tag strategy.
pub fn meta(name: &str) -> Strategy {
    Strategy::Meta {
        name: name.to_string(),
    }
}

/// Ordered extraction strategies for one logical field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FieldSpec {
    pub strategies: Vec<Strategy>,
}

impl FieldSpec {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Resolve to the first non-empty trimmed value, in strategy order.
    /// Later strategies are not consulted once one matches.
    pub fn resolve(&self, page: &Page) -> Option<String> {
        for strategy in &self.strategies {
            let value = match strategy {
                Strategy::Text { selector } => page.query_text(selector),
                Strategy::Attr { selector, attr } => page.query_attr(selector, attr),
                Strategy::Meta { name } => page.meta_content(name),
            };
            if let Some(v) = value {
                return Some(v);
            }
        }
        None
    }

    /// Resolve to every match of the first strategy that yields any.
    /// Items are never merged across strategies.
    pub fn resolve_all(&self, page: &Page) -> Vec<String> {
        for strategy in &self.strategies {
            let values = match strategy {
                Strategy::Text { selector } => page.query_text_all(selector),
                Strategy::Attr { selector, attr } => page
                    .select(selector)
                    .into_iter()
                    .filter_map(|el| {
                        el.value()
                            .attr(attr)
                            .map(str::trim)
                            .filter(|v| !v.is_empty())
                            .map(str::to_string)
                    })
                    .collect(),
                Strategy::Meta { name } => page.meta_content(name).into_iter().collect(),
            };
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }
}

static DIGIT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").unwrap());
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£¥₹₩]|\b(?:USD|EUR|GBP|JPY|CAD|AUD|INR|KRW)\b").unwrap());

/// Parse the first run of digits from free text (thousands separators
/// allowed inside the run). `None` on parse failure, never an error.
pub fn first_uint(s: &str) -> Option<u64> {
    let m = DIGIT_RUN_RE.find(s)?;
    m.as_str().replace(',', "").parse().ok()
}

/// Parse the first decimal number from free text (for ratings).
pub fn first_decimal(s: &str) -> Option<f64> {
    DECIMAL_RE.find(s)?.as_str().parse().ok()
}

/// Extract a currency symbol or ISO code from a resolved price string.
pub fn currency_of(price: &str) -> Option<String> {
    CURRENCY_RE.find(price).map(|m| m.as_str().to_string())
}

/// A hyperlink extracted from a page, normalized against the page base URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: String,
    pub external: bool,
}

/// Collect links inside `scope`, resolving relative hrefs against the page
/// URL and classifying a link as external when its hostname differs from the
/// page's. Fragment-only and javascript: hrefs are skipped.
pub fn collect_links(page: &Page, scope: ElementRef<'_>) -> Vec<Link> {
    let Some(sel) = cached_selector("a[href]") else {
        return Vec::new();
    };
    let page_host = page.host();
    scope
        .select(&sel)
        .filter_map(|el| {
            let raw = el.value().attr("href")?.trim();
            if raw.is_empty() || raw.starts_with('#') || raw.starts_with("javascript:") {
                return None;
            }
            let href = page.resolve_href(raw)?;
            let link_host = url::Url::parse(&href)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_lowercase()));
            let external = match (&page_host, &link_host) {
                (Some(p), Some(l)) => p != l,
                _ => false,
            };
            let text = el.text().collect::<Vec<_>>().join(" ");
            Some(Link {
                href,
                text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                external,
            })
        })
        .collect()
}

/// First container from `selectors` that exists on the page. Items are then
/// mapped within that single container only, never merged across containers.
pub fn first_container<'a>(page: &'a Page, selectors: &[&str]) -> Option<ElementRef<'a>> {
    page.first_matching(selectors)
}
