// ABOUTME: CLI binary for the dredge web scraper.
// ABOUTME: Scrapes URLs or local HTML files and outputs extracted content in various formats.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use dredge_scrape::{
    scrape_html, ContentKind, HttpBrowser, ProxyConfig, ScrapeOptions, ScrapeRecord,
    ScrapeRequest, Scraper,
};

#[derive(Parser, Debug)]
#[command(name = "dredge")]
#[command(about = "Scrape web pages and extract structured content")]
struct Args {
    /// Content type profile: news, ecommerce, techdocs, generic (default)
    #[arg(short = 't', long = "type", default_value = "generic")]
    content_type: String,

    /// Output format: json (default), markdown/md, text/txt, html
    #[arg(short = 'f', long = "format", default_value = "json")]
    format: String,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// HTML file to scrape (requires --url)
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// URL context for HTML file scraping (required with --html)
    #[arg(long = "url")]
    url: Option<String>,

    /// Print elapsed time in ms to stderr
    #[arg(long = "timing")]
    timing: bool,

    /// Skip the scrape cache for this run
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Skip per-domain rate limiting for this run
    #[arg(long = "no-rate-limit")]
    no_rate_limit: bool,

    /// Whole-scrape deadline in milliseconds
    #[arg(long = "timeout")]
    timeout: Option<u64>,

    /// Override the User-Agent header
    #[arg(long = "user-agent")]
    user_agent: Option<String>,

    /// Route requests through an HTTP(S) proxy
    #[arg(long = "proxy")]
    proxy: Option<String>,

    /// URLs to scrape (fetch mode)
    #[arg()]
    urls: Vec<String>,
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Json,
    Markdown,
    Text,
    Html,
}

fn parse_output_format(format: &str) -> OutputFormat {
    match format.to_lowercase().as_str() {
        "markdown" | "md" => OutputFormat::Markdown,
        "text" | "txt" => OutputFormat::Text,
        "html" => OutputFormat::Html,
        _ => OutputFormat::Json,
    }
}

fn record_content(record: &ScrapeRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => String::new(),
        OutputFormat::Markdown => record.markdown.clone().unwrap_or_default(),
        OutputFormat::Text => record.content.clone(),
        OutputFormat::Html => record.html.clone().unwrap_or_default(),
    }
}

/// Single record renders as one object, multiple as an array; non-JSON
/// formats emit the raw content field(s) joined by blank lines.
fn format_output(records: &[ScrapeRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            if records.len() == 1 {
                serde_json::to_string_pretty(&records[0]).unwrap_or_default()
            } else {
                serde_json::to_string_pretty(records).unwrap_or_default()
            }
        }
        _ => records
            .iter()
            .map(|r| record_content(r, format))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn build_options(args: &Args) -> ScrapeOptions {
    let mut options = ScrapeOptions::default();
    if args.no_cache {
        options.common.cache_enabled = false;
    }
    if args.no_rate_limit {
        options.common.rate_limit = false;
    }
    if let Some(timeout) = args.timeout {
        options.common.timeout = timeout;
    }
    if let Some(user_agent) = &args.user_agent {
        options.common.user_agent = Some(user_agent.clone());
    }
    if let Some(proxy) = &args.proxy {
        options.common.proxy = Some(ProxyConfig {
            url: proxy.clone(),
            username: None,
            password: None,
        });
    }
    options
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Validate args
    if args.html.is_some() && args.url.is_none() {
        eprintln!("error: --url is required when using --html");
        return ExitCode::from(1);
    }

    if args.html.is_none() && args.urls.is_empty() {
        eprintln!("error: at least one URL is required, or use --html with --url");
        return ExitCode::from(1);
    }

    if args.html.is_some() && !args.urls.is_empty() {
        eprintln!("error: cannot use both --html and positional URLs");
        return ExitCode::from(1);
    }

    let kind = match ContentKind::from_str(&args.content_type) {
        Ok(kind) => kind,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    let format = parse_output_format(&args.format);
    let options = build_options(&args);

    let start = Instant::now();
    let mut records: Vec<ScrapeRecord> = Vec::new();
    let mut had_error = false;

    if let Some(html_path) = &args.html {
        // HTML file mode: extract without fetching
        let url = args.url.as_deref().unwrap_or_default();
        match fs::read_to_string(html_path) {
            Ok(html) => match ScrapeRequest::new(url, kind, options) {
                Ok(request) => records.push(scrape_html(&html, &request)),
                Err(e) => {
                    eprintln!("error: {}", e);
                    had_error = true;
                }
            },
            Err(e) => {
                eprintln!("error reading file {:?}: {}", html_path, e);
                had_error = true;
            }
        }
    } else {
        // URL fetch mode
        let mut builder = Scraper::builder();
        if let Some(proxy) = &options.common.proxy {
            match HttpBrowser::with_proxy(proxy) {
                Ok(browser) => builder = builder.provider(Arc::new(browser)),
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(1);
                }
            }
        }
        let scraper = builder.build();

        for url in &args.urls {
            let request = match ScrapeRequest::new(url, kind, options.clone()) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("error scraping {}: {}", url, e);
                    had_error = true;
                    continue;
                }
            };
            match scraper.scrape(&request).await {
                Ok(outcome) => records.push(outcome.record),
                Err(e) => {
                    eprintln!("error scraping {}: {}", url, e);
                    had_error = true;
                }
            }
        }
    }

    let elapsed = start.elapsed();

    // Output results
    if !records.is_empty() {
        let output_str = format_output(&records, format);

        if let Some(output_path) = &args.output {
            if let Err(e) = fs::write(output_path, &output_str) {
                eprintln!("error writing to {:?}: {}", output_path, e);
                had_error = true;
            }
        } else {
            println!("{}", output_str);
        }
    }

    // Print timing if requested
    if args.timing {
        let _ = writeln!(io::stderr(), "elapsed: {}ms", elapsed.as_millis());
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
