//! Configuration module for Dirhunt
//!
//! This module handles loading TOML configuration files, expanding
//! command-line values and validating the merged result.
//!
//! # Example
//!
//! ```no_run
//! use dirhunt::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("dirhunt.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FiltersConfig, HttpConfig, OutputConfig, SourcesConfig,
    INTERESTING_EXTENSIONS, INTERESTING_FILES,
};

// Re-export parser functions
pub use parser::{
    comma_separated_files, expand_proxies, expand_seeds, flags_range, key_values, load_config,
    read_config,
};
pub use validation::validate;
