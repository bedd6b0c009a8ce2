//! Archived URLs from the Wayback Machine CDX API

use super::{Source, SourceError};
use async_trait::async_trait;

const WAYBACK_URL: &str = "https://web.archive.org/cdx/search/cdx";
const WAYBACK_LIMIT: &str = "100";

pub struct Wayback {
    client: reqwest::Client,
    endpoint: String,
}

impl Wayback {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, WAYBACK_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Source for Wayback {
    fn name(&self) -> &'static str {
        "wayback"
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let text = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("fl", "original"),
                ("collapse", "urlkey"),
                ("limit", WAYBACK_LIMIT),
                ("matchType", "domain"),
                ("filter", "statuscode:200"),
                ("url", domain),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
