//! Passive discovery sources
//!
//! A source turns a domain into candidate URLs without crawling it:
//! robots.txt rules, certificate transparency logs, crawl archives, search
//! engine results and the live TLS certificate. Every adapter runs behind
//! `run_source`, which answers from the on-disk cache when it can and turns
//! adapter failures into warnings with zero results.
//!
//! The URLs a source yields are handed back to the crawler, which admits
//! them like any other discovery.

mod cache;
mod certificatessl;
mod commoncrawl;
mod crtsh;
mod google;
mod pacing;
mod robots;
mod virustotal;
mod wayback;

pub use cache::{CacheEntry, SourceCache, CACHE_TTL_DAYS};
pub use certificatessl::CertificateSsl;
pub use commoncrawl::CommonCrawl;
pub use crtsh::CrtSh;
pub use google::Google;
pub use pacing::RequestPacer;
pub use robots::{robots_paths, Robots};
pub use virustotal::VirusTotal;
pub use wayback::Wayback;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Names accepted by the source exclusion list, in start order
pub const SOURCE_NAMES: &[&str] = &[
    "robots",
    "virustotal",
    "google",
    "commoncrawl",
    "crtsh",
    "certificatessl",
    "wayback",
];

/// Timeout applied to every source request
const SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures of a single source lookup
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Io(#[from] std::io::Error),

    /// The service detected automated access
    #[error("{0}")]
    Abuse(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Certificate error: {0}")]
    Tls(String),
}

/// A passive URL provider
#[async_trait]
pub trait Source: Send + Sync {
    /// Identifier used in logs, the cache and the exclusion list
    fn name(&self) -> &'static str;

    /// True if the URLs returned are known to exist
    fn confirms_existence(&self) -> bool {
        false
    }

    /// Candidate URLs for a domain
    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError>;
}

/// URLs contributed by one source for one domain
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub name: &'static str,
    pub domain: String,
    pub urls: Vec<String>,
    /// The URLs should be admitted with `exists` already set
    pub confirmed: bool,
}

/// The enabled sources of a crawl
pub struct Sources {
    sources: Vec<Arc<dyn Source>>,
    cache: Option<Arc<SourceCache>>,
}

impl Sources {
    /// Builds every source not named in `excluded`
    ///
    /// # Arguments
    ///
    /// * `client` - Client shared by the HTTP based adapters
    /// * `excluded` - Source names to skip
    /// * `cache` - Result cache, `None` to always query
    pub fn new(client: reqwest::Client, excluded: &[String], cache: Option<SourceCache>) -> Self {
        let all: Vec<Arc<dyn Source>> = vec![
            Arc::new(Robots::new(client.clone())),
            Arc::new(VirusTotal::new(client.clone())),
            Arc::new(Google::new(client.clone())),
            Arc::new(CommonCrawl::new(client.clone())),
            Arc::new(CrtSh::new(client.clone())),
            Arc::new(CertificateSsl::new()),
            Arc::new(Wayback::new(client)),
        ];
        let sources = all
            .into_iter()
            .filter(|source| !excluded.iter().any(|name| name == source.name()))
            .collect();
        Self {
            sources,
            cache: cache.map(Arc::new),
        }
    }

    /// Uses an explicit list of sources
    pub fn with_sources(sources: Vec<Arc<dyn Source>>, cache: Option<SourceCache>) -> Self {
        Self {
            sources,
            cache: cache.map(Arc::new),
        }
    }

    /// A registry that never yields anything
    pub fn none() -> Self {
        Self {
            sources: Vec::new(),
            cache: None,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Lookups to run for a newly admitted domain
    pub fn lookups(
        &self,
        domain: &str,
    ) -> Vec<impl std::future::Future<Output = SourceOutcome> + Send + 'static> {
        self.sources
            .iter()
            .map(|source| run_source(source.clone(), self.cache.clone(), domain.to_string()))
            .collect()
    }
}

/// Builds the client used by the HTTP based sources
pub fn source_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(SOURCE_TIMEOUT)
        .build()
}

/// Runs one source for one domain, going through the cache
///
/// Failures are logged and produce an empty outcome; they never reach the
/// crawl.
pub async fn run_source(
    source: Arc<dyn Source>,
    cache: Option<Arc<SourceCache>>,
    domain: String,
) -> SourceOutcome {
    let name = source.name();
    let confirmed = source.confirms_existence();

    if let Some(urls) = cache.as_ref().and_then(|cache| cache.load(name, &domain)) {
        tracing::debug!("Source {} answered {} from cache", name, domain);
        return SourceOutcome {
            name,
            domain,
            urls,
            confirmed,
        };
    }

    let urls = match source.search_by_domain(&domain).await {
        Ok(urls) => {
            tracing::debug!("Source {} found {} URLs for {}", name, urls.len(), domain);
            if let Some(cache) = &cache {
                if let Err(e) = cache.store(name, &domain, &urls) {
                    tracing::warn!("Failed to cache {} results for {}: {}", name, domain, e);
                }
            }
            urls
        }
        Err(e) => {
            tracing::warn!("Source {} failed for {}: {}", name, domain, e);
            Vec::new()
        }
    };

    SourceOutcome {
        name,
        domain,
        urls,
        confirmed,
    }
}
