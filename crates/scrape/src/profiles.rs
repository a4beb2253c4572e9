// ABOUTME: Content-type profiles: the selector chains each extractor resolves its fields through.
// ABOUTME: Chain order is reliability order across real sites: microdata/semantic first, utility classes, meta last.

use once_cell::sync::Lazy;

use crate::resolve::{attr, meta, text, FieldSpec};

/// Selector chains shared by every content type.
pub struct CommonProfile {
    pub title: FieldSpec,
    pub description: FieldSpec,
    pub lead_image: FieldSpec,
}

pub static COMMON: Lazy<CommonProfile> = Lazy::new(|| CommonProfile {
    title: FieldSpec::new(vec![
        meta("og:title"),
        meta("twitter:title"),
        text("h1"),
        text("title"),
    ]),
    description: FieldSpec::new(vec![
        meta("description"),
        meta("og:description"),
        meta("twitter:description"),
    ]),
    lead_image: FieldSpec::new(vec![
        meta("og:image"),
        meta("twitter:image"),
        attr("article img", "src"),
    ]),
});

pub struct NewsProfile {
    pub title: FieldSpec,
    pub authors: FieldSpec,
    pub date_published: FieldSpec,
    pub category: FieldSpec,
    /// Candidate containers for the article body, most specific first.
    pub content_containers: &'static [&'static str],
}

pub static NEWS: Lazy<NewsProfile> = Lazy::new(|| NewsProfile {
    title: FieldSpec::new(vec![
        text("h1[itemprop='headline']"),
        text("article h1"),
        text("h1.headline"),
        text(".article-title"),
        meta("og:title"),
        text("h1"),
    ]),
    authors: FieldSpec::new(vec![
        text("[itemprop='author'] [itemprop='name']"),
        text("[itemprop='author']"),
        text("[rel='author']"),
        text(".author-name"),
        text(".byline__name"),
        text(".byline"),
        meta("author"),
    ]),
    date_published: FieldSpec::new(vec![
        attr("time[datetime]", "datetime"),
        meta("article:published_time"),
        meta("date"),
        text("time"),
    ]),
    category: FieldSpec::new(vec![
        meta("article:section"),
        text(".category"),
        text("[itemprop='articleSection']"),
    ]),
    content_containers: &[
        "[itemprop='articleBody']",
        ".article-body",
        ".post-content",
        ".entry-content",
        "article",
        "main",
    ],
});

pub struct EcommerceProfile {
    pub title: FieldSpec,
    pub price: FieldSpec,
    pub availability: FieldSpec,
    pub brand: FieldSpec,
    pub sku: FieldSpec,
    pub rating: FieldSpec,
    pub review_count: FieldSpec,
    pub description: FieldSpec,
    pub images: FieldSpec,
    pub spec_rows: &'static [&'static str],
    pub variant_options: &'static [&'static str],
    pub review_blocks: &'static [&'static str],
    pub related_items: &'static [&'static str],
}

pub static ECOMMERCE: Lazy<EcommerceProfile> = Lazy::new(|| EcommerceProfile {
    title: FieldSpec::new(vec![
        text("h1[itemprop='name']"),
        text(".product-title"),
        text(".product-name"),
        meta("og:title"),
        text("h1"),
    ]),
    price: FieldSpec::new(vec![
        attr("[itemprop='price']", "content"),
        text("[itemprop='price']"),
        text(".price"),
        text(".product-price"),
        meta("product:price:amount"),
        meta("og:price:amount"),
    ]),
    availability: FieldSpec::new(vec![
        attr("[itemprop='availability']", "href"),
        text("[itemprop='availability']"),
        text(".availability"),
        text(".stock-status"),
    ]),
    brand: FieldSpec::new(vec![
        text("[itemprop='brand'] [itemprop='name']"),
        text("[itemprop='brand']"),
        text(".brand"),
        meta("product:brand"),
    ]),
    sku: FieldSpec::new(vec![
        attr("[itemprop='sku']", "content"),
        text("[itemprop='sku']"),
        text(".sku"),
    ]),
    rating: FieldSpec::new(vec![
        attr("[itemprop='ratingValue']", "content"),
        text("[itemprop='ratingValue']"),
        text(".rating-value"),
        text(".star-rating"),
    ]),
    review_count: FieldSpec::new(vec![
        attr("[itemprop='reviewCount']", "content"),
        text("[itemprop='reviewCount']"),
        text(".review-count"),
    ]),
    description: FieldSpec::new(vec![
        text("[itemprop='description']"),
        text(".product-description"),
        meta("og:description"),
        meta("description"),
    ]),
    images: FieldSpec::new(vec![
        attr(".product-gallery img", "src"),
        attr(".product-images img", "src"),
        attr("[itemprop='image']", "src"),
        attr(".product img", "src"),
    ]),
    spec_rows: &[
        ".specifications tr",
        ".product-specs tr",
        ".spec-table tr",
        "table.specs tr",
    ],
    variant_options: &[
        ".variants option",
        ".product-options option",
        "select[name='variant'] option",
        ".variant-list li",
    ],
    review_blocks: &["[itemprop='review']", ".review", ".product-review"],
    related_items: &[".related-products a", ".recommendations a", ".also-bought a"],
});

pub struct TechDocsProfile {
    pub title: FieldSpec,
    pub version: FieldSpec,
    /// Table-of-contents containers, most specific first. When none
    /// exists the document headings serve as a flat fallback.
    pub toc_containers: &'static [&'static str],
    pub content_containers: &'static [&'static str],
}

pub static TECHDOCS: Lazy<TechDocsProfile> = Lazy::new(|| TechDocsProfile {
    title: FieldSpec::new(vec![
        text("article h1"),
        text("main h1"),
        text(".doc-title"),
        meta("og:title"),
        text("h1"),
    ]),
    version: FieldSpec::new(vec![
        text(".version"),
        text(".doc-version"),
        text("[data-version]"),
        attr("[data-version]", "data-version"),
    ]),
    toc_containers: &["nav.toc", ".toc", "#toc", ".table-of-contents", "nav.sidebar"],
    content_containers: &[".doc-content", ".markdown-body", "article", "main"],
});

pub struct GenericProfile {
    pub content_containers: &'static [&'static str],
}

pub static GENERIC: Lazy<GenericProfile> = Lazy::new(|| GenericProfile {
    content_containers: &["article", "main", ".content", "#content", "body"],
});
