//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one client per proxy with the configured headers
//! - Bounded body reads
//! - Error classification for the retry path

use crate::config::Config;
use crate::processors::Page;
use crate::state::CrawlerUrl;
use crate::{ConfigError, DirhuntError, VERSION};
use crate::url::Url;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION,
};
use reqwest::{redirect::Policy, Client, Proxy, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Bodies are truncated past this many bytes
pub const MAX_RESPONSE_SIZE: usize = 1024 * 512;

/// Pause between two attempts at the same URL
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Failure of a single exchange
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(reqwest::Error),

    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("Failed to read body: {0}")]
    Body(reqwest::Error),

    #[error("Crawl is shutting down")]
    Closed,
}

impl FetchError {
    fn from_request(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_connect() {
            Self::Connect(error)
        } else {
            Self::Request(error)
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Body(_) => true,
            Self::Request(error) => error.is_timeout() || error.is_connect(),
            Self::Closed => false,
        }
    }
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("dirhunt/{}", VERSION)
}

fn default_headers(config: &Config) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.http.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Validation(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Validation(format!("Invalid header value for '{}': {}", name, e)))?;
        headers.insert(name, value);
    }

    if !config.http.cookies.is_empty() {
        let cookie = config
            .http
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| ConfigError::Validation(format!("Invalid cookie value: {}", e)))?;
        headers.insert(COOKIE, value);
    }
    Ok(headers)
}

/// Builds the HTTP clients of a crawl, one per proxy or a single direct one
///
/// # Arguments
///
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(Vec<Client>)` - Clients to rotate through
/// * `Err(DirhuntError)` - Invalid header, cookie or proxy
pub fn build_http_clients(config: &Config) -> Result<Vec<Client>, DirhuntError> {
    let headers = default_headers(config)?;
    let user_agent = config
        .http
        .user_agent
        .clone()
        .unwrap_or_else(default_user_agent);
    let timeout = Duration::from_secs(config.crawler.timeout);

    let builder = || {
        Client::builder()
            .user_agent(user_agent.clone())
            .default_headers(headers.clone())
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .gzip(true)
            .brotli(true)
    };

    if config.http.proxies.is_empty() {
        return Ok(vec![builder().build()?]);
    }

    let mut clients = Vec::with_capacity(config.http.proxies.len());
    for proxy in &config.http.proxies {
        clients.push(builder().proxy(Proxy::all(proxy.as_str())?).build()?);
    }
    Ok(clients)
}

/// A listed file, read in full up to `MAX_RESPONSE_SIZE`
#[derive(Debug, Clone, Default)]
pub struct FileResponse {
    pub status: u16,
    /// From the `Content-Length` header
    pub content_length: Option<u64>,
    pub body: String,
}

/// Performs single exchanges, rotating clients
pub struct Fetcher {
    clients: Vec<Client>,
    next: AtomicUsize,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self, DirhuntError> {
        Ok(Self {
            clients: build_http_clients(config)?,
            next: AtomicUsize::new(0),
            timeout: Duration::from_secs(config.crawler.timeout),
            retries: config.crawler.retries,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Overrides the pause between attempts
    pub fn set_retry_delay(&mut self, retry_delay: Duration) {
        self.retry_delay = retry_delay;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    fn client(&self) -> &Client {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    /// Fetches a URL once
    ///
    /// The body is only read for successful responses that may be a
    /// directory page, a stylesheet or a script; anything else is classified
    /// from its headers alone.
    pub async fn fetch(&self, crawler_url: &CrawlerUrl) -> Result<Page, FetchError> {
        let exchange = async {
            let response = self
                .client()
                .get(crawler_url.url.as_str())
                .send()
                .await
                .map_err(|e| FetchError::from_request(e, self.timeout))?;
            read_page(response, crawler_url).await
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }

    /// Fetches a file found in a directory listing, body included
    pub async fn fetch_file(&self, url: &Url) -> Result<FileResponse, FetchError> {
        let exchange = async {
            let response = self
                .client()
                .get(url.as_str())
                .send()
                .await
                .map_err(|e| FetchError::from_request(e, self.timeout))?;
            let status = response.status().as_u16();
            let content_length =
                header(&response, CONTENT_LENGTH).and_then(|value| value.trim().parse().ok());
            let body = read_body(response, url).await?;
            Ok(FileResponse {
                status,
                content_length,
                body,
            })
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }
}

fn header(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn wants_body(status: u16, content_type: Option<&str>, crawler_url: &CrawlerUrl) -> bool {
    if status >= 300 {
        return false;
    }
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    crawler_url.maybe_directory()
        || content_type.starts_with("text/css")
        || content_type.starts_with("application/javascript")
}

async fn read_body(mut response: Response, url: &Url) -> Result<String, FetchError> {
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(FetchError::Body)? {
        let remaining = MAX_RESPONSE_SIZE - bytes.len();
        if chunk.len() >= remaining {
            bytes.extend_from_slice(&chunk[..remaining]);
            tracing::debug!("Truncated body of {}", url);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn read_page(response: Response, crawler_url: &CrawlerUrl) -> Result<Page, FetchError> {
    let status = response.status().as_u16();
    let content_type = header(&response, CONTENT_TYPE);
    let location = header(&response, LOCATION);

    let body = if wants_body(status, content_type.as_deref(), crawler_url) {
        Some(read_body(response, &crawler_url.url).await?)
    } else {
        None
    };

    Ok(Page {
        status,
        content_type,
        location,
        body,
    })
}
