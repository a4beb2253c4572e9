// ABOUTME: HTML sanitization and conversion to Markdown and plain text.
// ABOUTME: Carries custom htmd handlers for images with dimensions, bare pre blocks, and pipe tables.

//! Output format conversion.
//!
//! Extracted content HTML is sanitized with ammonia, then converted to
//! Markdown with htmd or flattened to plain text. Conversion never fails:
//! on htmd error the input HTML is returned unchanged.

use std::rc::Rc;

use htmd::element_handler::{HandlerResult, Handlers};
use htmd::Element;
use markup5ever_rcdom::{Node, NodeData};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

/// Sanitize HTML with an ammonia policy for article-style content.
///
/// Allowed elements: p, br, strong, b, em, i, u, h1-h6, ul, ol, li,
/// blockquote, pre, code, img, a, span, div, plus table structure
/// (table/thead/tbody/tfoot/tr/th/td). `class` survives on pre and code so
/// the markdown converter can recover fence languages.
pub fn sanitize_html(html: &str) -> String {
    let allowed_tags = [
        "p", "br", "strong", "b", "em", "i", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
        "li", "blockquote", "pre", "code", "img", "a", "span", "div", "table", "thead", "tbody",
        "tfoot", "tr", "th", "td",
    ];

    let mut builder = ammonia::Builder::new();
    builder.tags(allowed_tags.iter().copied().collect());

    builder.add_tag_attributes("a", &["href"]);
    builder.add_tag_attributes("img", &["src", "alt", "width", "height", "srcset", "sizes"]);
    builder.add_tag_attributes("div", &["class", "id"]);
    builder.add_tag_attributes("span", &["class", "id"]);
    builder.add_tag_attributes("p", &["class"]);
    builder.add_tag_attributes("img", &["class"]);
    builder.add_tag_attributes("a", &["class"]);
    builder.add_tag_attributes("pre", &["class"]);
    builder.add_tag_attributes("code", &["class"]);
    for h in &["h1", "h2", "h3", "h4", "h5", "h6"] {
        builder.add_tag_attributes(h, &["id"]);
    }

    builder
        .url_schemes(["http", "https", "mailto"].iter().copied().collect())
        .clean(html)
        .to_string()
}

/// Preprocess HTML before conversion: replace <br> tags with newlines and
/// rewrite `lang-*` classes to the `language-*` form htmd recognizes.
fn preprocess_html(html: &str) -> String {
    static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?\s*>").unwrap());
    static LANG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"class=(["'])lang-"#).unwrap());
    let html = BR_RE.replace_all(html, "\n");
    LANG_RE.replace_all(&html, "class=${1}language-").to_string()
}

/// Collapse more than 2 consecutive blank lines to exactly 2.
fn collapse_blank_lines_to_two(text: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
    RE.replace_all(text, "\n\n").to_string()
}

fn collapse_newlines_to_one(text: &str) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());
    RE.replace_all(text, "\n").to_string()
}

fn element_tag(node: &Rc<Node>) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// Fence language from a `language-*` class token.
fn language_from_class(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find_map(|token| token.strip_prefix("language-"))
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

/// Images render as `![alt](src =WxH)` when the tag carries dimensions,
/// with one-sided `=Wx` / `=xH` forms. An image without a usable src
/// renders as nothing.
fn render_image(_: &dyn Handlers, el: Element) -> Option<HandlerResult> {
    let attr = |name: &str| {
        el.attrs
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let src = attr("src")?;
    let src = src.replace('(', "\\(").replace(')', "\\)");
    let alt = attr("alt").unwrap_or_default();
    let suffix = match (attr("width"), attr("height")) {
        (Some(w), Some(h)) => format!(" ={}x{}", w, h),
        (Some(w), None) => format!(" ={}x", w),
        (None, Some(h)) => format!(" =x{}", h),
        (None, None) => String::new(),
    };
    Some(format!("![{}]({}{})", alt, src, suffix).into())
}

/// A <pre> that wraps a <code> child is a fenced block already (htmd's code
/// handler does that). A bare <pre> still has to become a fence, with the
/// language taken from the pre's own class.
fn render_pre(handlers: &dyn Handlers, el: Element) -> Option<HandlerResult> {
    let has_code_child = el
        .node
        .children
        .borrow()
        .iter()
        .any(|c| element_tag(c) == Some("code"));
    if has_code_child {
        return handlers.fallback(el);
    }
    let lang = el
        .attrs
        .iter()
        .find(|a| &*a.name.local == "class")
        .and_then(|a| language_from_class(&a.value))
        .unwrap_or_default();
    let content = handlers.walk_children(el.node).content;
    let code = content.trim_matches('\n');
    Some(format!("\n\n```{}\n{}\n```\n\n", lang, code).into())
}

/// Pipe tables with the first row as header whether or not the markup has a
/// thead. htmd's builtin handler leaves header-less tables without a
/// separator row, which most markdown renderers refuse to treat as a table.
fn render_table(handlers: &dyn Handlers, el: Element) -> Option<HandlerResult> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    collect_rows(handlers, el.node, &mut rows);

    if rows.is_empty() {
        let content = handlers.walk_children(el.node).content;
        let content = content.trim_matches('\n');
        if content.is_empty() {
            return None;
        }
        return Some(format!("\n\n{}\n\n", content).into());
    }

    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = String::from("\n\n");
    for (i, cells) in rows.iter().enumerate() {
        out.push('|');
        for c in 0..cols {
            out.push(' ');
            out.push_str(cells.get(c).map(String::as_str).unwrap_or(""));
            out.push_str(" |");
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            for _ in 0..cols {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out.push('\n');
    Some(out.into())
}

fn collect_rows(handlers: &dyn Handlers, node: &Rc<Node>, rows: &mut Vec<Vec<String>>) {
    for child in node.children.borrow().iter() {
        match element_tag(child) {
            Some("tr") => rows.push(row_cells(handlers, child)),
            Some("thead") | Some("tbody") | Some("tfoot") => collect_rows(handlers, child, rows),
            _ => {}
        }
    }
}

fn row_cells(handlers: &dyn Handlers, tr: &Rc<Node>) -> Vec<String> {
    tr.children
        .borrow()
        .iter()
        .filter(|c| matches!(element_tag(c), Some("th") | Some("td")))
        .map(|cell| {
            let content = handlers.walk_children(cell).content;
            content
                .replace('|', "\\|")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Convert HTML to Markdown.
///
/// Skips script/style/noscript, renders images with dimension hints,
/// fenced code blocks with languages, and pipe tables, then collapses
/// runs of blank lines to two. On conversion error the input is returned
/// unchanged.
pub fn html_to_markdown(html: &str) -> String {
    let preprocessed = preprocess_html(html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript"])
        .add_handler(vec!["img"], render_image)
        .add_handler(vec!["pre"], render_pre)
        .add_handler(vec!["table"], render_table)
        .build();

    let md = converter
        .convert(&preprocessed)
        .unwrap_or_else(|_| preprocessed.clone());

    collapse_blank_lines_to_two(&md)
}

/// Flatten HTML to plain text: tags stripped, <br> as newline, horizontal
/// whitespace collapsed, blank lines collapsed to one, result trimmed.
pub fn html_to_text(html: &str) -> String {
    let preprocessed = preprocess_html(html);

    let document = Html::parse_document(&preprocessed);
    let raw_text: String = document.root_element().text().collect::<Vec<_>>().join(" ");

    static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
    let normalized = SPACES_RE.replace_all(&raw_text, " ");

    let collapsed = collapse_newlines_to_one(&normalized);
    collapsed.trim().to_string()
}
