//! Detected URLs listed on the VirusTotal domain page

use super::{RequestPacer, Source, SourceError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const VT_URL: &str = "https://www.virustotal.com/es/domain/{domain}/information/";
const ABUSE: &str = "VirusTotal is trying to prevent scraping and abuse";
const PACE: Duration = Duration::from_secs(10);

pub struct VirusTotal {
    client: reqwest::Client,
    url_template: String,
    pacer: RequestPacer,
}

impl VirusTotal {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, VT_URL)
    }

    /// `url_template` must contain a `{domain}` placeholder
    pub fn with_endpoint(client: reqwest::Client, url_template: &str) -> Self {
        Self {
            client,
            url_template: url_template.to_string(),
            pacer: RequestPacer::new(PACE),
        }
    }
}

/// Text of the `#detected-urls` entries
fn detected_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("#detected-urls .enum a") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|anchor| anchor.text().collect::<String>().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

#[async_trait]
impl Source for VirusTotal {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let url = self.url_template.replace("{domain}", domain);
        let html = self
            .pacer
            .run(async { self.client.get(&url).send().await?.text().await })
            .await?;
        if html.contains(ABUSE) {
            return Err(SourceError::Abuse(format!(
                "VirusTotal detected scraping. Validate the captcha manually: {}",
                url
            )));
        }
        Ok(detected_urls(&html))
    }
}
