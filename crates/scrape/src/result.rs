// ABOUTME: Output data model: ScrapeRecord envelope plus per-content-type field payloads.
// ABOUTME: TypedFields is serde-untagged so cached JSON round-trips back into the right variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resolve::Link;

/// One scraped page, ready for serialization. The per-type payload is
/// flattened into the record so consumers see a single flat JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRecord {
    pub url: String,
    pub title: String,
    /// Plain-text rendition of the main content.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Free-form page metadata (description, og: tags, word count, ...).
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: TypedFields,
}

/// Per-content-type payload. Untagged: on deserialization each variant is
/// recognized by the mandatory list fields it alone carries, so Generic
/// (which requires nothing) must stay last.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedFields {
    News(NewsFields),
    Product(ProductFields),
    Docs(DocsFields),
    Generic(GenericFields),
}

impl Default for TypedFields {
    fn default() -> Self {
        TypedFields::Generic(GenericFields {})
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsFields {
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub images: Vec<String>,
    pub specifications: Vec<Specification>,
    pub variants: Vec<String>,
    pub reviews: Vec<Review>,
    pub related: Vec<RelatedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub table_of_contents: Vec<TocEntry>,
    pub headings: Vec<Heading>,
    pub code_samples: Vec<CodeSample>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeSample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericFields {}

/// Wire envelope for API-style consumers: success and failure share one
/// shape so clients can branch on the `success` flag alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
}

impl ApiEnvelope {
    pub fn success(data: Value, processing_ms: u64) -> (u16, Self) {
        (
            200,
            Self {
                success: true,
                data: Some(data),
                error: None,
                timestamp: Utc::now(),
                processing_time: Some(processing_ms),
            },
        )
    }

    pub fn failure(err: &crate::error::ScrapeError) -> (u16, Self) {
        (
            err.status_code(),
            Self {
                success: false,
                data: None,
                error: Some(err.client_message()),
                timestamp: Utc::now(),
                processing_time: None,
            },
        )
    }
}

/// Whitespace-delimited word count over plain text.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
