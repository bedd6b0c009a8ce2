//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlerUrl`: the per-target record (depth, type, existence, flags)
//! - `TaskState`: lifecycle of a submitted URL
//! - `Registry`: shared domains, processing and processed bookkeeping

mod crawler_url;
mod registry;
mod task_state;

// Re-export main types
pub use crawler_url::{CrawlerUrl, Origin, UrlType, FLAGS_WEIGHT, INDEX_FILES};
pub use registry::{Claim, CompletionReceiver, CompletionSender, DomainAdmission, Registry};
pub use task_state::TaskState;
