// ABOUTME: Per-content-type extractors: turn a rendered page into typed fields plus content HTML.
// ABOUTME: Every field is best-effort; a page that matches nothing still yields a record.

//! Content extraction.
//!
//! Each content type walks its profile's selector chains over the page and
//! assembles the typed payload. The main content container doubles as the
//! source for the markdown/text renditions, with the whole body as a last
//! resort so no page produces an empty record.

use chrono::{DateTime, Utc};
use scraper::ElementRef;

use crate::options::{EcommerceOptions, NewsOptions, TechDocsOptions};
use crate::profiles;
use crate::resolve::{collect_links, currency_of, first_decimal, first_uint, FieldSpec};
use crate::result::{
    CodeSample, DocsFields, GenericFields, Heading, NewsFields, ProductFields, RelatedItem,
    Review, Specification, TocEntry, TypedFields,
};
use crate::selectors::cached_selector;
use crate::session::Page;

/// The extracted payload plus the HTML chosen as the page's main content.
pub struct Extraction {
    pub title: String,
    pub content_html: String,
    pub fields: TypedFields,
}

fn content_html(page: &Page, containers: &[&str]) -> String {
    page.first_inner_html(containers)
        .unwrap_or_else(|| page.body_inner_html())
}

fn fallback_title(page: &Page) -> String {
    profiles::COMMON
        .title
        .resolve(page)
        .or_else(|| page.document_title())
        .unwrap_or_default()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dates arrive in anything from ISO 8601 to "March 5, 2024"; dateparser
/// handles the long tail. Unparseable dates drop the field.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    dateparser::parse(raw.trim()).ok()
}

fn image_sources(page: &Page, scope: ElementRef<'_>) -> Vec<String> {
    let Some(sel) = cached_selector("img[src]") else {
        return Vec::new();
    };
    let mut seen = Vec::new();
    for img in scope.select(&sel) {
        let Some(src) = img.value().attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if let Some(resolved) = page.resolve_href(src) {
            if !seen.contains(&resolved) {
                seen.push(resolved);
            }
        }
    }
    seen
}

pub fn extract_news(page: &Page, options: &NewsOptions) -> Extraction {
    let profile = &*profiles::NEWS;
    let title = profile
        .title
        .resolve(page)
        .unwrap_or_else(|| fallback_title(page));

    let authors = profile.authors.resolve_all(page);
    let date_published = profile
        .date_published
        .resolve(page)
        .and_then(|raw| parse_date(&raw));
    let category = profile.category.resolve(page);
    let description = profiles::COMMON.description.resolve(page);
    let lead_image_url = profiles::COMMON
        .lead_image
        .resolve(page)
        .and_then(|src| page.resolve_href(&src));

    let container = page.first_matching(profile.content_containers);

    let images = if options.include_images {
        container
            .map(|c| image_sources(page, c))
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    let links = if options.include_links {
        container
            .map(|c| collect_links(page, c))
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    Extraction {
        title,
        content_html: content_html(page, profile.content_containers),
        fields: TypedFields::News(NewsFields {
            authors,
            date_published,
            category,
            description,
            lead_image_url,
            images,
            links,
        }),
    }
}

pub fn extract_ecommerce(page: &Page, options: &EcommerceOptions) -> Extraction {
    let profile = &*profiles::ECOMMERCE;
    let title = profile
        .title
        .resolve(page)
        .unwrap_or_else(|| fallback_title(page));

    let price = profile.price.resolve(page);
    // Currency comes out of the price string itself; a bare number keeps
    // the field empty rather than guessing.
    let currency = price.as_deref().and_then(currency_of);
    let availability = profile.availability.resolve(page).map(|a| {
        // Schema.org availability URLs collapse to their fragment.
        match a.rsplit_once('/') {
            Some((prefix, status)) if prefix.contains("schema.org") => status.to_string(),
            _ => a,
        }
    });
    let brand = profile.brand.resolve(page);
    let sku = profile.sku.resolve(page);
    let rating = profile
        .rating
        .resolve(page)
        .as_deref()
        .and_then(first_decimal);
    let review_count = profile
        .review_count
        .resolve(page)
        .as_deref()
        .and_then(first_uint);
    let description = profile.description.resolve(page);

    let images = if options.include_images {
        profile
            .images
            .resolve_all(page)
            .into_iter()
            .filter_map(|src| page.resolve_href(&src))
            .collect()
    } else {
        Vec::new()
    };

    let specifications = if options.include_specifications {
        extract_specifications(page, profile.spec_rows)
    } else {
        Vec::new()
    };

    let variants = if options.include_variants {
        FieldSpec::new(
            profile
                .variant_options
                .iter()
                .map(|s| crate::resolve::text(s))
                .collect(),
        )
        .resolve_all(page)
    } else {
        Vec::new()
    };

    let reviews = if options.include_reviews {
        extract_reviews(page, profile.review_blocks)
    } else {
        Vec::new()
    };

    let related = if options.include_related {
        extract_related(page, profile.related_items)
    } else {
        Vec::new()
    };

    Extraction {
        title,
        content_html: content_html(page, &["[itemprop='description']", ".product", "main"]),
        fields: TypedFields::Product(ProductFields {
            price,
            currency,
            availability,
            brand,
            sku,
            rating,
            review_count,
            description,
            images,
            specifications,
            variants,
            reviews,
            related,
        }),
    }
}

fn extract_specifications(page: &Page, row_selectors: &[&str]) -> Vec<Specification> {
    for selector in row_selectors {
        let rows = page.select(selector);
        if rows.is_empty() {
            continue;
        }
        let specs: Vec<Specification> = rows
            .into_iter()
            .filter_map(|row| {
                let cell_sel = cached_selector("th, td")?;
                let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
                match cells.as_slice() {
                    [label, value, ..] if !label.is_empty() => Some(Specification {
                        label: label.clone(),
                        value: value.clone(),
                    }),
                    _ => None,
                }
            })
            .collect();
        if !specs.is_empty() {
            return specs;
        }
    }
    Vec::new()
}

fn extract_reviews(page: &Page, block_selectors: &[&str]) -> Vec<Review> {
    let Some(block) = block_selectors
        .iter()
        .find(|s| !page.select(s).is_empty())
    else {
        return Vec::new();
    };
    page.select(block)
        .into_iter()
        .filter_map(|el| {
            let text_sel = cached_selector("[itemprop='reviewBody'], .review-text, .review-body, p")?;
            let text = el
                .select(&text_sel)
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(el));
            if text.is_empty() {
                return None;
            }
            let rating_sel = cached_selector("[itemprop='ratingValue'], .rating-value, .rating")?;
            let rating = el
                .select(&rating_sel)
                .next()
                .map(element_text)
                .as_deref()
                .and_then(first_decimal);
            let author_sel = cached_selector("[itemprop='author'], .review-author, .author")?;
            let author = el
                .select(&author_sel)
                .next()
                .map(element_text)
                .filter(|a| !a.is_empty());
            Some(Review {
                text,
                rating,
                author,
            })
        })
        .collect()
}

fn extract_related(page: &Page, item_selectors: &[&str]) -> Vec<RelatedItem> {
    for selector in item_selectors {
        let items: Vec<RelatedItem> = page
            .select(selector)
            .into_iter()
            .filter_map(|el| {
                let title = element_text(el);
                if title.is_empty() {
                    return None;
                }
                let url = el
                    .value()
                    .attr("href")
                    .and_then(|href| page.resolve_href(href));
                Some(RelatedItem { title, url })
            })
            .collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

pub fn extract_techdocs(page: &Page, options: &TechDocsOptions) -> Extraction {
    let profile = &*profiles::TECHDOCS;
    let title = profile
        .title
        .resolve(page)
        .unwrap_or_else(|| fallback_title(page));
    let version = profile.version.resolve(page);

    let headings = if options.include_headings || options.include_toc {
        extract_headings(page)
    } else {
        Vec::new()
    };

    let table_of_contents = if options.include_toc {
        extract_toc(page, profile.toc_containers, &headings)
    } else {
        Vec::new()
    };

    let code_samples = if options.include_code {
        extract_code_samples(page)
    } else {
        Vec::new()
    };

    let links = if options.include_links {
        page.first_matching(profile.content_containers)
            .map(|c| collect_links(page, c))
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    Extraction {
        title,
        content_html: content_html(page, profile.content_containers),
        fields: TypedFields::Docs(DocsFields {
            version,
            table_of_contents,
            headings: if options.include_headings {
                headings
            } else {
                Vec::new()
            },
            code_samples,
            links,
        }),
    }
}

fn extract_headings(page: &Page) -> Vec<Heading> {
    page.select("h1, h2, h3, h4, h5, h6")
        .into_iter()
        .filter_map(|el| {
            let text = element_text(el);
            if text.is_empty() {
                return None;
            }
            let level = el.value().name().as_bytes().get(1).map(|b| b - b'0')?;
            Some(Heading { level, text })
        })
        .collect()
}

/// A nav-style TOC wins; without one the document headings flatten into a
/// fragment-less list so the field is never silently absent.
fn extract_toc(page: &Page, containers: &[&str], headings: &[Heading]) -> Vec<TocEntry> {
    if let Some(nav) = page.first_matching(containers) {
        if let Some(sel) = cached_selector("a") {
            let entries: Vec<TocEntry> = nav
                .select(&sel)
                .filter_map(|a| {
                    let text = element_text(a);
                    if text.is_empty() {
                        return None;
                    }
                    Some(TocEntry {
                        text,
                        href: a.value().attr("href").map(str::to_string),
                    })
                })
                .collect();
            if !entries.is_empty() {
                return entries;
            }
        }
    }
    headings
        .iter()
        .map(|h| TocEntry {
            text: h.text.clone(),
            href: None,
        })
        .collect()
}

fn extract_code_samples(page: &Page) -> Vec<CodeSample> {
    page.select("pre")
        .into_iter()
        .filter_map(|pre| {
            let code_sel = cached_selector("code")?;
            let (code, class) = match pre.select(&code_sel).next() {
                Some(code_el) => (
                    code_el.text().collect::<String>(),
                    code_el.value().attr("class").map(str::to_string),
                ),
                None => (
                    pre.text().collect::<String>(),
                    pre.value().attr("class").map(str::to_string),
                ),
            };
            let code = code.trim_matches('\n').to_string();
            if code.is_empty() {
                return None;
            }
            let language = class.as_deref().and_then(|c| {
                c.split_whitespace().find_map(|token| {
                    token
                        .strip_prefix("language-")
                        .or_else(|| token.strip_prefix("lang-"))
                        .filter(|l| !l.is_empty())
                        .map(str::to_string)
                })
            });
            Some(CodeSample { language, code })
        })
        .collect()
}

pub fn extract_generic(page: &Page) -> Extraction {
    Extraction {
        title: fallback_title(page),
        content_html: content_html(page, profiles::GENERIC.content_containers),
        fields: TypedFields::Generic(GenericFields {}),
    }
}
