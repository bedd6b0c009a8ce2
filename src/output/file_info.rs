//! Details of interesting files found in directory listings
//!
//! Once the crawl settles, every interesting listing entry is fetched once on
//! a bounded pool. Files answering with text are reported with their status,
//! size and a line of their content.

use crate::crawler::{FetchError, Fetcher, FileResponse, Scheduler};
use crate::processors::{html, interesting_files, CrawlResult, ListingEntry, ProcessSettings, Processor};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Characters of text kept per file
const TEXT_LENGTH: usize = 120;

const SIZE_UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// A fetched interesting file
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub entry: ListingEntry,
    pub status: u16,
    /// `Content-Length` when sent, else the bytes read
    pub size: u64,
    pub text: String,
}

impl FileInfo {
    fn from_response(entry: ListingEntry, response: FileResponse) -> Self {
        Self {
            entry,
            status: response.status,
            size: response
                .content_length
                .unwrap_or(response.body.len() as u64),
            text: file_text(&response.body),
        }
    }

    /// `[status] (size) url [listing metadata] text`
    pub fn line(&self) -> String {
        let mut line = format!(
            "[{}] ({:>6}) {}",
            self.status,
            format_size(self.size),
            self.entry.url
        );
        let extra: Vec<&str> = [&self.entry.extra.created_at, &self.entry.extra.filesize]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            line.push_str(&format!(" [{}]", extra.join(" ")));
        }
        line.push(' ');
        line.push_str(&self.text);
        line
    }
}

/// Outcome of the interesting file pass
#[derive(Debug, Clone, Default)]
pub struct FileInfoReport {
    /// Files with text, sorted by address
    pub files: Vec<FileInfo>,
    /// Files fetched without any text
    pub empty: usize,
    /// Files that could not be fetched
    pub errors: usize,
}

impl FileInfoReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.empty == 0 && self.errors == 0
    }
}

/// Binary size with one unit, e.g. `2KiB`
pub fn format_size(size: u64) -> String {
    let mut value = size as f64;
    for unit in SIZE_UNITS {
        if value < 1024.0 {
            return format!("{}{}B", value as u64, unit);
        }
        value /= 1024.0;
    }
    format!("{}YiB", value as u64)
}

/// Title, else visible body text, else the raw body, whitespace collapsed
pub fn file_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let text = html::title(&document)
        .filter(|title| !title.is_empty())
        .or_else(|| body_text(&document))
        .unwrap_or_else(|| body.to_string());
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(TEXT_LENGTH)
        .collect()
}

fn body_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    let text: String = document.select(&selector).next()?.text().collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Interesting entries of every listing, once each, sorted by address
pub fn interesting_entries<'a>(
    results: impl IntoIterator<Item = &'a CrawlResult>,
    settings: &ProcessSettings,
) -> Vec<ListingEntry> {
    let mut entries = BTreeMap::new();
    for result in results {
        if let Processor::IndexOf { files } = &result.processor {
            for entry in interesting_files(files, settings) {
                entries
                    .entry(entry.url.as_str().to_string())
                    .or_insert_with(|| entry.clone());
            }
        }
    }
    entries.into_values().collect()
}

/// Fetches every entry, at most `workers` at a time
///
/// Each fetch takes a slot from `scheduler`, so the per-domain limit and
/// delay of the crawl apply here too.
pub async fn collect_file_info(
    fetcher: &Fetcher,
    scheduler: &Scheduler,
    entries: Vec<ListingEntry>,
    workers: usize,
) -> FileInfoReport {
    let outcomes: Vec<(ListingEntry, Result<FileResponse, FetchError>)> = stream::iter(entries)
        .map(|entry| async move {
            let domain = entry.url.domain().unwrap_or_default().to_string();
            let outcome = match scheduler.acquire(&domain).await {
                Ok(slot) => {
                    let outcome = fetcher.fetch_file(&entry.url).await;
                    slot.release().await;
                    outcome
                }
                Err(_) => Err(FetchError::Closed),
            };
            (entry, outcome)
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut report = FileInfoReport::default();
    for (entry, outcome) in outcomes {
        match outcome {
            Ok(response) => {
                let info = FileInfo::from_response(entry, response);
                if info.text.is_empty() {
                    report.empty += 1;
                } else {
                    report.files.push(info);
                }
            }
            Err(error) => {
                tracing::debug!("Unable to fetch {}: {}", entry.url, error);
                report.errors += 1;
            }
        }
    }
    report
        .files
        .sort_by(|a, b| a.entry.url.as_str().cmp(b.entry.url.as_str()));
    report
}

/// Prints the interesting file pass to stdout
pub fn print_file_info(report: &FileInfoReport) {
    if report.is_empty() {
        println!("No interesting files detected");
        return;
    }
    println!("Interesting files ({}):", report.files.len());
    for info in &report.files {
        println!("{}", info.line());
    }
    if report.empty > 0 {
        println!("{} empty file(s) not shown", report.empty);
    }
    if report.errors > 0 {
        println!("{} file(s) could not be fetched", report.errors);
    }
}
