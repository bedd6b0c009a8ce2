use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Extensions reported from directory listings by default
pub const INTERESTING_EXTENSIONS: &[&str] = &["php", "zip", "sh", "asp", "csv", "log"];

/// File names reported from directory listings by default
pub const INTERESTING_FILES: &[&str] = &["access_log", "error_log", "error", "logs", "dump"];

/// Main configuration structure for Dirhunt
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Seed URLs
    pub urls: Vec<String>,
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub filters: FiltersConfig,
    pub sources: SourcesConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Global number of simultaneous fetches
    pub threads: usize,

    /// Simultaneous fetches against one domain
    pub concurrency: usize,

    /// Recursion budget given to seed URLs
    pub max_depth: i32,

    /// Per-request timeout (seconds)
    pub timeout: u64,

    /// Pause before releasing a domain slot (seconds)
    pub delay: f64,

    /// Extra attempts after a transient fetch error
    pub retries: u32,

    /// Stop after this many processed URLs, 0 for no limit
    pub limit: usize,

    pub follow_redirects: bool,
    pub follow_subdomains: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            concurrency: 10,
            max_depth: 3,
            timeout: 10,
            delay: 0.0,
            retries: 2,
            limit: 1000,
            follow_redirects: true,
            follow_subdomains: true,
        }
    }
}

/// Request shaping
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Defaults to `dirhunt/<version>`
    pub user_agent: Option<String>,
    pub cookies: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// Proxy URLs rotated per request; `tor` is accepted as an alias
    pub proxies: Vec<String>,
}

/// Result filtering and content of interest
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FiltersConfig {
    pub include_flags: Vec<String>,
    pub exclude_flags: Vec<String>,
    pub interesting_extensions: Vec<String>,
    pub interesting_files: Vec<String>,
    pub interesting_keywords: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            include_flags: Vec::new(),
            exclude_flags: Vec::new(),
            interesting_extensions: INTERESTING_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            interesting_files: INTERESTING_FILES.iter().map(|s| s.to_string()).collect(),
            interesting_keywords: Vec::new(),
        }
    }
}

/// Passive source configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourcesConfig {
    /// Source names to skip
    pub exclude: Vec<String>,

    /// Overrides the per-user cache directory
    pub cache_dir: Option<PathBuf>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Resume and report file
    pub to_file: Option<PathBuf>,

    /// Print result lines while crawling
    pub progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            to_file: None,
            progress: true,
        }
    }
}
