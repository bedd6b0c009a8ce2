//! Dirhunt main entry point
//!
//! This is the command-line interface for the Dirhunt directory crawler.

use anyhow::Context;
use clap::Parser;
use dirhunt::config::{
    comma_separated_files, expand_proxies, expand_seeds, key_values, read_config, validate,
    Config,
};
use dirhunt::output::{print_file_info, print_ranked, print_statistics, rank, FlagFilter};
use dirhunt::Crawler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Dirhunt: find web directories without brute force
///
/// Dirhunt crawls a site, classifies every response and follows the
/// directories it finds. Passive sources such as robots.txt, certificate
/// logs and web archives contribute extra candidates.
#[derive(Parser, Debug)]
#[command(name = "dirhunt")]
#[command(version)]
#[command(about = "Find web directories without brute force", long_about = None)]
struct Cli {
    /// Seed URLs, or files with one URL per line
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of concurrent fetches
    #[arg(short, long)]
    threads: Option<usize>,

    /// Concurrent fetches per domain
    #[arg(long)]
    concurrency: Option<usize>,

    /// Return only results with these flags (comma separated, ranges like 200-299)
    #[arg(short, long, value_name = "FLAGS")]
    include_flags: Option<String>,

    /// Hide results with these flags (comma separated, ranges like 400-499)
    #[arg(short = 'x', long, value_name = "FLAGS")]
    exclude_flags: Option<String>,

    /// File extensions worth reporting (comma separated)
    #[arg(short = 'e', long, value_name = "EXTENSIONS")]
    interesting_extensions: Option<String>,

    /// File names worth reporting (comma separated)
    #[arg(short = 'f', long, value_name = "FILES")]
    interesting_files: Option<String>,

    /// Words to look for in fetched pages (comma separated)
    #[arg(short = 'k', long, value_name = "KEYWORDS")]
    interesting_keywords: Option<String>,

    /// Maximum links to follow without increasing directory depth
    #[arg(long)]
    max_depth: Option<i32>,

    /// Stay on the seed domains
    #[arg(long)]
    not_follow_subdomains: bool,

    /// Sources to skip (comma separated)
    #[arg(long, value_name = "SOURCES")]
    exclude_sources: Option<String>,

    /// Proxies to rotate (comma separated), or "tor"
    #[arg(short, long, value_name = "PROXIES")]
    proxies: Option<String>,

    /// Seconds to wait between requests to the same domain
    #[arg(short, long)]
    delay: Option<f64>,

    /// Seconds before a request is abandoned
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not follow redirects
    #[arg(long)]
    not_allow_redirects: bool,

    /// Stop after this many processed URLs (0 disables)
    #[arg(long)]
    limit: Option<usize>,

    /// Report file, resumed from when it exists
    #[arg(long, value_name = "FILE")]
    to_file: Option<PathBuf>,

    /// User agent to send
    #[arg(short, long)]
    user_agent: Option<String>,

    /// Cookies to send, as key:value
    #[arg(short = 'c', long = "cookie", value_name = "KEY:VALUE")]
    cookies: Vec<String>,

    /// Headers to send, as key:value
    #[arg(id = "header", long = "header", value_name = "KEY:VALUE")]
    headers: Vec<String>,

    /// Attempts after a failed request
    #[arg(long)]
    retries: Option<u32>,

    /// Do not print results while crawling
    #[arg(long)]
    no_progress: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    tracing::info!(
        "Starting crawl of {} seed(s), max depth {}",
        config.urls.len(),
        config.crawler.max_depth
    );

    let filter = FlagFilter::from_config(&config.filters);
    let report = Crawler::new(config)
        .context("Failed to set up the crawler")?
        .with_interrupts()
        .run()
        .await
        .context("Crawl failed")?;

    println!();
    print_ranked(&rank(&report.results, &filter));
    println!();
    print_file_info(&report.interesting_files);
    println!();
    print_statistics(&report.statistics);

    if report.limit_reached {
        println!("\nLimit of processed URLs reached.");
    }
    if let Some(path) = &report.snapshot {
        if report.limit_reached || report.aborted {
            println!(
                "Run again with --to-file {} to continue the crawl.",
                path.display()
            );
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("dirhunt=info,warn"),
            1 => EnvFilter::new("dirhunt=debug,info"),
            2 => EnvFilter::new("dirhunt=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, if any, and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if !cli.urls.is_empty() {
        config.urls = cli.urls.clone();
    }
    config.urls = expand_seeds(&config.urls)?;

    let crawler = &mut config.crawler;
    if let Some(threads) = cli.threads {
        crawler.threads = threads;
    }
    if let Some(concurrency) = cli.concurrency {
        crawler.concurrency = concurrency;
    }
    if let Some(max_depth) = cli.max_depth {
        crawler.max_depth = max_depth;
    }
    if let Some(delay) = cli.delay {
        crawler.delay = delay;
    }
    if let Some(limit) = cli.limit {
        crawler.limit = limit;
    }
    if let Some(retries) = cli.retries {
        crawler.retries = retries;
    }
    if let Some(timeout) = cli.timeout {
        crawler.timeout = timeout;
    }
    if cli.not_follow_subdomains {
        crawler.follow_subdomains = false;
    }
    if cli.not_allow_redirects {
        crawler.follow_redirects = false;
    }

    let filters = &mut config.filters;
    if let Some(value) = &cli.include_flags {
        filters.include_flags = comma_separated_files(value)?;
    }
    if let Some(value) = &cli.exclude_flags {
        filters.exclude_flags = comma_separated_files(value)?;
    }
    if let Some(value) = &cli.interesting_extensions {
        filters.interesting_extensions = comma_separated_files(value)?;
    }
    if let Some(value) = &cli.interesting_files {
        filters.interesting_files = comma_separated_files(value)?;
    }
    if let Some(value) = &cli.interesting_keywords {
        filters.interesting_keywords = comma_separated_files(value)?;
    }
    if let Some(value) = &cli.exclude_sources {
        config.sources.exclude = comma_separated_files(value)?;
    }

    let http = &mut config.http;
    if let Some(user_agent) = &cli.user_agent {
        http.user_agent = Some(user_agent.clone());
    }
    http.cookies.extend(key_values(&cli.cookies)?);
    http.headers.extend(key_values(&cli.headers)?);
    if let Some(value) = &cli.proxies {
        http.proxies = comma_separated_files(value)?;
    }
    http.proxies = expand_proxies(&http.proxies);

    if let Some(path) = &cli.to_file {
        config.output.to_file = Some(path.clone());
    }
    if cli.no_progress {
        config.output.progress = false;
    }

    validate(&config)?;
    Ok(config)
}
