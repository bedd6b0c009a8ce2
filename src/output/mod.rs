//! Output module for crawl results
//!
//! This module handles:
//! - Filtering results by classification flags
//! - Ranking and printing the final list of directories
//! - Fetching and reporting interesting files found in directory listings
//! - Snapshots for reports and resumed crawls
//! - End-of-run statistics

pub mod file_info;
pub mod report;
pub mod stats;

pub use file_info::{
    collect_file_info, format_size, interesting_entries, print_file_info, FileInfo,
    FileInfoReport,
};
pub use report::{default_report_path, load_snapshot, write_snapshot, ReportEntry, Snapshot};
pub use stats::{print_statistics, CrawlStatistics};

use crate::config::{flags_range, FiltersConfig};
use crate::processors::CrawlResult;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Include/exclude sets applied to result flags
#[derive(Debug, Clone, Default)]
pub struct FlagFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl FlagFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: flags_range(include).into_iter().collect(),
            exclude: flags_range(exclude).into_iter().collect(),
        }
    }

    pub fn from_config(config: &FiltersConfig) -> Self {
        Self::new(&config.include_flags, &config.exclude_flags)
    }

    /// Directory candidates with no excluded flag and, if set, an included one
    pub fn accepts(&self, result: &CrawlResult) -> bool {
        let crawler_url = &result.crawler_url;
        crawler_url.maybe_directory()
            && crawler_url.flags.is_disjoint(&self.exclude)
            && (self.include.is_empty() || !crawler_url.flags.is_disjoint(&self.include))
    }
}

/// Accepted results, heaviest first
///
/// Ties keep address order so that output is stable between runs.
pub fn rank<'a>(
    results: impl IntoIterator<Item = &'a CrawlResult>,
    filter: &FlagFilter,
) -> Vec<&'a CrawlResult> {
    let mut ranked: Vec<&CrawlResult> = results
        .into_iter()
        .filter(|result| filter.accepts(result))
        .collect();
    ranked.sort_by(|a, b| {
        b.crawler_url
            .weight()
            .partial_cmp(&a.crawler_url.weight())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.crawler_url.key().cmp(b.crawler_url.key()))
    });
    ranked
}

/// Prints the ranked addresses to stdout
pub fn print_ranked(ranked: &[&CrawlResult]) {
    for result in ranked {
        println!("{}", result.crawler_url.url);
    }
}

/// Prints a result line to stderr while crawling
pub fn print_live(result: &CrawlResult, filter: &FlagFilter) {
    if filter.accepts(result) || result.is_error() {
        eprintln!("{}", result.line());
    }
}
