//! On-disk cache of source results
//!
//! One JSON file per (source, domain) under the cache directory. Entries
//! expire after `CACHE_TTL_DAYS` and are ignored when they were written by
//! another version of the tool.

use crate::VERSION;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Days a cached result stays usable
pub const CACHE_TTL_DAYS: i64 = 7;

/// Cached lookup of one source for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: String,
    pub domain: String,
    pub urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(domain: &str, urls: &[String]) -> Self {
        Self {
            version: VERSION.to_string(),
            domain: domain.to_string(),
            urls: urls.to_vec(),
            created_at: Utc::now(),
        }
    }

    /// Checks if the entry is older than the TTL
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.created_at > Duration::days(CACHE_TTL_DAYS)
    }

    /// Usable by this version and not expired
    pub fn is_valid(&self) -> bool {
        self.version == VERSION && !self.is_stale()
    }
}

/// Filesystem store for `CacheEntry` values
#[derive(Debug, Clone)]
pub struct SourceCache {
    root: PathBuf,
}

impl SourceCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<user cache dir>/dirhunt`, if the platform has one
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("dirhunt"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `source` and `domain`
    pub fn entry_path(&self, source: &str, domain: &str) -> PathBuf {
        let file_name: String = domain
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(source).join(format!("{}.json", file_name))
    }

    /// Returns the cached URLs, or `None` when missing, unreadable, stale or from another version
    pub fn load(&self, source: &str, domain: &str) -> Option<Vec<String>> {
        let content = std::fs::read_to_string(self.entry_path(source, domain)).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;
        (entry.is_valid() && entry.domain == domain).then_some(entry.urls)
    }

    /// Writes the entry for `source` and `domain`, replacing any previous one
    pub fn store(&self, source: &str, domain: &str, urls: &[String]) -> std::io::Result<()> {
        self.write_entry(source, &CacheEntry::new(domain, urls))
    }

    fn write_entry(&self, source: &str, entry: &CacheEntry) -> std::io::Result<()> {
        let path = self.entry_path(source, &entry.domain);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(entry)?;
        std::fs::write(path, content)
    }
}
