//! URLs from the latest Common Crawl index

use super::{Source, SourceError};
use async_trait::async_trait;
use serde::Deserialize;

const COLLINFO_URL: &str = "https://index.commoncrawl.org/collinfo.json";

/// Index results kept per domain
const MAX_RESULTS: usize = 1000;

#[derive(Debug, Deserialize)]
struct CrawlIndex {
    #[serde(rename = "cdx-api")]
    cdx_api: String,
}

#[derive(Debug, Deserialize)]
struct IndexRecord {
    url: String,
}

pub struct CommonCrawl {
    client: reqwest::Client,
    collinfo_url: String,
}

impl CommonCrawl {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, COLLINFO_URL)
    }

    /// `collinfo_url` lists the available indexes, newest first
    pub fn with_endpoint(client: reqwest::Client, collinfo_url: &str) -> Self {
        Self {
            client,
            collinfo_url: collinfo_url.to_string(),
        }
    }

    async fn latest_index(&self) -> Result<String, SourceError> {
        let body = self
            .client
            .get(&self.collinfo_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let indexes: Vec<CrawlIndex> = serde_json::from_str(&body)?;
        indexes
            .into_iter()
            .next()
            .map(|index| index.cdx_api)
            .ok_or_else(|| SourceError::Parse("no crawl index available".to_string()))
    }
}

#[async_trait]
impl Source for CommonCrawl {
    fn name(&self) -> &'static str {
        "commoncrawl"
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let cdx_api = self.latest_index().await?;
        let pattern = format!("*.{}", domain);
        let text = self
            .client
            .get(&cdx_api)
            .query(&[("url", pattern.as_str()), ("output", "json")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let urls = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<IndexRecord>(line) {
                Ok(record) => Some(record.url),
                Err(e) => {
                    tracing::debug!("Skipping index line for {}: {}", domain, e);
                    None
                }
            })
            .take(MAX_RESULTS)
            .collect();
        Ok(urls)
    }
}
