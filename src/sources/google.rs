//! Search engine results for a `site:` query

use super::{RequestPacer, Source, SourceError};
use crate::url::{is_subdomain_of, Url};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const GOOGLE_URL: &str = "https://www.google.com/search";
const RESULTS: &str = "20";
const PACE: Duration = Duration::from_secs(3);

/// Markers of the anti-bot interstitial
const CAPTCHA_MARKERS: &[&str] = &["unusual traffic", "captcha-form", "/sorry/index"];

pub struct Google {
    client: reqwest::Client,
    endpoint: String,
    pacer: RequestPacer,
}

impl Google {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, GOOGLE_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            pacer: RequestPacer::new(PACE),
        }
    }
}

/// Result links of a search page that point into `domain`
///
/// Links wrapped in the `/url?q=` redirector are unwrapped first.
fn result_links(html: &str, domain: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let mut links: Vec<String> = Vec::new();
    for href in document.select(&selector).filter_map(|anchor| anchor.value().attr("href")) {
        let target = match href.strip_prefix("/url?") {
            Some(query) => ::url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "q")
                .map(|(_, value)| value.into_owned()),
            None => Some(href.to_string()),
        };
        let Some(target) = target else {
            continue;
        };
        let url = Url::new(&target);
        let in_domain = url
            .domain()
            .is_some_and(|host| is_subdomain_of(host, domain));
        if in_domain && !links.contains(&target) {
            links.push(target);
        }
    }
    links
}

#[async_trait]
impl Source for Google {
    fn name(&self) -> &'static str {
        "google"
    }

    fn confirms_existence(&self) -> bool {
        true
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let query = format!("site:{}", domain);
        let html = self
            .pacer
            .run(async {
                self.client
                    .get(&self.endpoint)
                    .query(&[("q", query.as_str()), ("num", RESULTS)])
                    .send()
                    .await?
                    .text()
                    .await
            })
            .await?;
        if CAPTCHA_MARKERS.iter().any(|marker| html.contains(marker)) {
            return Err(SourceError::Abuse(
                "Google is asking for a captcha, skipping search results".to_string(),
            ));
        }
        Ok(result_links(&html, domain))
    }
}
