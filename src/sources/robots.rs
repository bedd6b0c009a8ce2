//! robots.txt rules as a source of paths
//!
//! Disallowed paths are usually the interesting ones. Wildcard rules are cut
//! at the first `*` and end anchors are dropped, leaving the fixed prefix.

use super::{Source, SourceError};
use async_trait::async_trait;
use robotstxt::{parse_robotstxt, RobotsParseHandler};

/// Collects the values of path and sitemap rules for every user agent
#[derive(Debug, Default)]
struct RuleCollector {
    paths: Vec<String>,
    sitemaps: Vec<String>,
}

impl RuleCollector {
    fn add_path(&mut self, value: &str) {
        let value = value.split('*').next().unwrap_or("").trim_end_matches('$');
        if !value.is_empty() && !self.paths.iter().any(|path| path == value) {
            self.paths.push(value.to_string());
        }
    }
}

impl RobotsParseHandler for RuleCollector {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, _user_agent: &str) {}

    fn handle_allow(&mut self, _line_num: u32, value: &str) {
        self.add_path(value);
    }

    fn handle_disallow(&mut self, _line_num: u32, value: &str) {
        self.add_path(value);
    }

    fn handle_sitemap(&mut self, _line_num: u32, value: &str) {
        self.sitemaps.push(value.to_string());
    }

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {}
}

/// Paths named by the Allow and Disallow rules of a robots.txt body
///
/// Absolute sitemap locations are returned as-is after the paths.
///
/// # Example
///
/// ```
/// use dirhunt::sources::robots_paths;
///
/// let paths = robots_paths("User-agent: *\nDisallow: /admin/\nDisallow: /*.php$\n");
/// assert_eq!(paths, vec!["/admin/", "/"]);
/// ```
pub fn robots_paths(content: &str) -> Vec<String> {
    let mut collector = RuleCollector::default();
    parse_robotstxt(content, &mut collector);
    let mut paths = collector.paths;
    paths.extend(collector.sitemaps);
    paths
}

fn get_url(protocol: &str, domain: &str, path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }
    format!("{}://{}/{}", protocol, domain, path.trim_start_matches('/'))
}

/// Reads `robots.txt` over http, falling back to https
pub struct Robots {
    client: reqwest::Client,
}

impl Robots {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, protocol: &str, domain: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(get_url(protocol, domain, "robots.txt"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Source for Robots {
    fn name(&self) -> &'static str {
        "robots"
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        let (protocol, content) = match self.fetch("http", domain).await {
            Ok(content) => ("http", content),
            Err(e) => {
                tracing::debug!("robots.txt over http failed for {}: {}", domain, e);
                ("https", self.fetch("https", domain).await?)
            }
        };
        Ok(robots_paths(&content)
            .iter()
            .map(|path| get_url(protocol, domain, path))
            .collect())
    }
}
