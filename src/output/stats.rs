//! End-of-run statistics
//!
//! This module provides functionality for summarizing processed results
//! and displaying them after the ranked listing.

use crate::processors::{CrawlResult, ProcessorKind};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Total number of processed URLs
    pub total_processed: usize,

    /// Count of results by processor
    pub by_processor: BTreeMap<ProcessorKind, usize>,

    /// Results whose fetch failed
    pub errors: usize,

    /// Results that exist and may be directories
    pub directories: usize,

    /// Number of domains admitted to the crawl
    pub domains: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Summarizes a set of results
    ///
    /// # Arguments
    ///
    /// * `results` - The processed results
    /// * `domains` - The admitted domains
    /// * `elapsed` - Duration of the run
    pub fn from_results<'a>(
        results: impl IntoIterator<Item = &'a CrawlResult>,
        domains: &BTreeSet<String>,
        elapsed: Duration,
    ) -> Self {
        let mut stats = Self {
            domains: domains.len(),
            elapsed,
            ..Self::default()
        };
        for result in results {
            stats.total_processed += 1;
            *stats.by_processor.entry(result.kind()).or_insert(0) += 1;
            if result.is_error() {
                stats.errors += 1;
            }
            let crawler_url = &result.crawler_url;
            if crawler_url.maybe_directory() && crawler_url.exists == Some(true) {
                stats.directories += 1;
            }
        }
        stats
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Processed URLs: {}", stats.total_processed);
    println!("  Existing directories: {}", stats.directories);
    println!("  Domains: {}", stats.domains);
    println!("  Errors: {}", stats.errors);
    println!("  Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
    println!();

    println!("Results by Processor:");
    // Sort by count (descending)
    let mut counts: Vec<_> = stats.by_processor.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1));

    for (kind, count) in counts {
        let percentage = if stats.total_processed > 0 {
            (*count as f64 / stats.total_processed as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::Processor;
    use crate::state::CrawlerUrl;
    use crate::url::Url;

    fn result(address: &str, processor: Processor, exists: Option<bool>) -> CrawlResult {
        let crawler_url = CrawlerUrl::new(Url::new(address), 3).with_exists(exists);
        CrawlResult::new(processor, Some(200), crawler_url)
    }

    #[test]
    fn test_from_results() {
        let results = vec![
            result("http://example.com/", Processor::Html, Some(true)),
            result("http://example.com/a/", Processor::Html, Some(true)),
            result("http://example.com/b/", Processor::NotFound, None),
            result(
                "http://example.com/c/",
                Processor::Error {
                    message: "timeout".to_string(),
                },
                None,
            ),
        ];
        let domains = BTreeSet::from(["example.com".to_string()]);
        let stats = CrawlStatistics::from_results(&results, &domains, Duration::from_secs(3));

        assert_eq!(stats.total_processed, 4);
        assert_eq!(stats.by_processor.get(&ProcessorKind::Html), Some(&2));
        assert_eq!(stats.by_processor.get(&ProcessorKind::NotFound), Some(&1));
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.domains, 1);
    }

    #[test]
    fn test_empty() {
        let stats = CrawlStatistics::from_results(&[], &BTreeSet::new(), Duration::ZERO);
        assert_eq!(stats, CrawlStatistics::default());
    }
}
