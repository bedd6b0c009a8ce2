//! Crawler module for directory discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Per-domain and global fetch slots
//! - The Ctrl-C prompt
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
pub mod interrupt;
mod scheduler;

pub use coordinator::{CrawlReport, Crawler, TaskOutput};
pub use fetcher::{
    build_http_clients, default_user_agent, FetchError, Fetcher, FileResponse, MAX_RESPONSE_SIZE,
    RETRY_DELAY,
};
pub use interrupt::InterruptChoice;
pub use scheduler::{FetchSlot, Scheduler};

use crate::config::Config;
use crate::DirhuntError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resume from the report file when one exists
/// 2. Start the passive sources of every seed domain
/// 3. Fetch and classify pages, following directories
/// 4. Write the report file when asked to
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished
/// * `Err(DirhuntError)` - Crawl could not start or its report could not be written
pub async fn crawl(config: Config) -> Result<CrawlReport, DirhuntError> {
    Crawler::new(config)?.run().await
}
