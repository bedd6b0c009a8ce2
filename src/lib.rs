//! Dirhunt: find web directories without brute force
//!
//! This crate crawls outward from seed URLs, infers directory structure from
//! HTML, CSS and JavaScript content plus HTTP response metadata, and folds in
//! passive reconnaissance sources to discover further paths on the same domains.

pub mod config;
pub mod crawler;
pub mod output;
pub mod processors;
pub mod sources;
pub mod state;
pub mod url;

use thiserror::Error;

/// Version written into resume snapshots and source cache entries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main error type for Dirhunt operations
#[derive(Debug, Error)]
pub enum DirhuntError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resume error: {0}")]
    Resume(#[from] ResumeError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("At least one URL is required")]
    NoUrls,

    #[error("--include-flags and --exclude-flags are mutually exclusive")]
    ConflictingFlags,

    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

/// Errors raised while loading a resume snapshot
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("Failed to access resume file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resume file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Resume file was written by version {found}, this is version {expected}")]
    IncompatibleVersion { found: String, expected: String },
}

/// Result type alias for Dirhunt operations
pub type Result<T> = std::result::Result<T, DirhuntError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for resume operations
pub type ResumeResult<T> = std::result::Result<T, ResumeError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler};
pub use processors::{Processor, ProcessorKind};
pub use state::{CrawlerUrl, UrlType};
pub use crate::url::{full_url_address, is_url_loop, Url};
