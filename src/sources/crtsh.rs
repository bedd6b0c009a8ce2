//! Certificate transparency names from crt.sh

use super::{Source, SourceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;

const CRTSH_URL: &str = "https://crt.sh/";

#[derive(Debug, Deserialize)]
struct Certificate {
    common_name: Option<String>,
}

/// Hosts named by certificates issued for the domain
pub struct CrtSh {
    client: reqwest::Client,
    endpoint: String,
}

impl CrtSh {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, CRTSH_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl Source for CrtSh {
    fn name(&self) -> &'static str {
        "crtsh"
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[("q", domain), ("output", "json")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let certificates: Vec<Certificate> = serde_json::from_str(&body)?;

        let names: BTreeSet<String> = certificates
            .into_iter()
            .filter_map(|certificate| certificate.common_name)
            .map(|name| name.trim_start_matches("*.").to_lowercase())
            .filter(|name| !name.is_empty() && !name.contains(' '))
            .collect();
        Ok(names.into_iter().map(|name| format!("https://{}/", name)).collect())
    }
}
