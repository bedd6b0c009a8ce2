//! URL handling module for Dirhunt
//!
//! This module provides the `Url` value type with its path algebra
//! (breadcrumb ancestors, directory path, child resolution), the resolver for
//! references found in markup, loop detection and domain suffix matching.

mod domain;
mod loop_detect;
mod resolve;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use domain::{is_subdomain_of, parent_domains};
pub use loop_detect::{is_url_loop, LOOP_THRESHOLD};
pub use resolve::full_url_address;

/// A parsed web address with structural accessors
///
/// The raw address is always kept. It is parsed once at construction; an
/// address without a scheme or host is kept but reported as invalid, and
/// every accessor on it returns an empty value.
///
/// Equality and hashing use the normalized address string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "UrlRecord", into = "UrlRecord")]
pub struct Url {
    address: String,
    parsed: Option<::url::Url>,
}

/// Serialized form of a `Url`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UrlRecord {
    address: String,
    #[serde(default)]
    domain: Option<String>,
}

impl Url {
    /// Parses an address
    ///
    /// # Examples
    ///
    /// ```
    /// use dirhunt::Url;
    ///
    /// let url = Url::new("http://example.com/a/b");
    /// assert!(url.is_valid());
    /// assert_eq!(url.domain(), Some("example.com"));
    /// assert!(!Url::new("/relative/path").is_valid());
    /// ```
    pub fn new(address: &str) -> Self {
        let parsed = ::url::Url::parse(address.trim())
            .ok()
            .filter(|parsed| !parsed.scheme().is_empty() && parsed.host_str().is_some());
        Self {
            address: address.to_string(),
            parsed,
        }
    }

    /// Returns true if the address has both a scheme and an authority
    pub fn is_valid(&self) -> bool {
        self.parsed.is_some()
    }

    /// Normalized address string (the raw address when invalid)
    pub fn as_str(&self) -> &str {
        match &self.parsed {
            Some(parsed) => parsed.as_str(),
            None => &self.address,
        }
    }

    /// Scheme of the address, e.g. `http`
    pub fn protocol(&self) -> Option<&str> {
        self.parsed.as_ref().map(|parsed| parsed.scheme())
    }

    /// Host without port
    pub fn domain(&self) -> Option<&str> {
        self.parsed.as_ref().and_then(|parsed| parsed.host_str())
    }

    /// Host with the explicit port, if any
    pub fn domain_port(&self) -> Option<String> {
        let parsed = self.parsed.as_ref()?;
        let host = parsed.host_str()?;
        Some(match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Port, falling back to the scheme default
    pub fn port(&self) -> Option<u16> {
        self.parsed.as_ref().and_then(|parsed| parsed.port_or_known_default())
    }

    /// Returns true if the host is an IP address
    pub fn is_ip(&self) -> bool {
        matches!(
            self.parsed.as_ref().and_then(|parsed| parsed.host()),
            Some(::url::Host::Ipv4(_)) | Some(::url::Host::Ipv6(_))
        )
    }

    /// Path component, empty for invalid addresses
    pub fn path(&self) -> &str {
        self.parsed.as_ref().map(|parsed| parsed.path()).unwrap_or("")
    }

    pub fn query(&self) -> Option<&str> {
        self.parsed.as_ref().and_then(|parsed| parsed.query())
    }

    pub fn fragment(&self) -> Option<&str> {
        self.parsed.as_ref().and_then(|parsed| parsed.fragment())
    }

    /// Assigns a path relative to the current one
    ///
    /// Any `#fragment` or `?query` captured in `value` is moved to its own
    /// field. Duplicated slashes are collapsed before resolution.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirhunt::Url;
    ///
    /// let mut url = Url::new("http://example.com/a/b/");
    /// url.set_path("c.php?id=1#top");
    /// assert_eq!(url.as_str(), "http://example.com/a/b/c.php?id=1#top");
    /// ```
    pub fn set_path(&mut self, value: &str) {
        let Some(parsed) = self.parsed.as_mut() else {
            return;
        };
        let (value, fragment) = split_marker(value, '#');
        let (value, query) = split_marker(value, '?');
        let mut value = value.to_string();
        while value.contains("//") {
            value = value.replace("//", "/");
        }
        // A leading "segment:" would otherwise be taken as a scheme
        if value
            .split('/')
            .next()
            .is_some_and(|first| first.contains(':'))
        {
            value.insert_str(0, "./");
        }

        let mut base = parsed.clone();
        base.set_query(None);
        base.set_fragment(None);
        if let Ok(joined) = base.join(&value) {
            parsed.set_path(joined.path());
        }
        if let Some(query) = query {
            parsed.set_query(Some(query));
        }
        if let Some(fragment) = fragment {
            parsed.set_fragment(Some(fragment));
        }
        self.address = parsed.to_string();
    }

    pub fn set_query(&mut self, query: Option<&str>) {
        if let Some(parsed) = self.parsed.as_mut() {
            parsed.set_query(query.filter(|query| !query.is_empty()));
            self.address = parsed.to_string();
        }
    }

    pub fn set_fragment(&mut self, fragment: Option<&str>) {
        if let Some(parsed) = self.parsed.as_mut() {
            parsed.set_fragment(fragment.filter(|fragment| !fragment.is_empty()));
            self.address = parsed.to_string();
        }
    }

    /// Returns a copy with `name` resolved against this path
    pub fn child(&self, name: &str) -> Url {
        let mut url = self.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.set_path(name);
        url
    }

    /// The path if it ends in `/`, otherwise its parent directory
    pub fn directory_path(&self) -> String {
        let path = self.path();
        match path.rfind('/') {
            Some(index) => path[..=index].to_string(),
            None => "/".to_string(),
        }
    }

    /// Final path segment, empty for directories
    pub fn name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or("")
    }

    /// Non-empty path segments
    pub fn segments(&self) -> Vec<&str> {
        self.path().split('/').filter(|segment| !segment.is_empty()).collect()
    }

    /// Ancestor directories from the root down to, excluding, the URL's own directory
    ///
    /// # Examples
    ///
    /// ```
    /// use dirhunt::Url;
    ///
    /// let url = Url::new("http://example.com/a/b/c");
    /// let crumbs: Vec<String> = url.breadcrumb().map(|url| url.path().to_string()).collect();
    /// assert_eq!(crumbs, vec!["/", "/a/", "/a/b/"]);
    /// ```
    pub fn breadcrumb(&self) -> impl Iterator<Item = Url> + '_ {
        let segments: Vec<String> = self.segments().into_iter().map(str::to_string).collect();
        (0..segments.len()).map(move |level| {
            let path: String = segments[..level]
                .iter()
                .map(|segment| format!("{}/", segment))
                .collect();
            self.with_absolute_path(&format!("/{}", path))
        })
    }

    /// Directory one level above the current path
    pub fn parent(&self) -> Url {
        let path = self.path().trim_end_matches('/');
        match path.rfind('/') {
            Some(index) => self.with_absolute_path(&path[..=index]),
            None => self.with_absolute_path("/"),
        }
    }

    fn with_absolute_path(&self, path: &str) -> Url {
        let mut url = self.clone();
        if let Some(parsed) = url.parsed.as_mut() {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.set_path(path);
            url.address = parsed.to_string();
        }
        url
    }
}

/// Splits `value` at the first `marker`, returning the text after it
fn split_marker(value: &str, marker: char) -> (&str, Option<&str>) {
    match value.split_once(marker) {
        Some((head, tail)) => (head, Some(tail)),
        None => (value, None),
    }
}

impl PartialEq for Url {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Url {}

impl Hash for Url {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<UrlRecord> for Url {
    fn from(record: UrlRecord) -> Self {
        Url::new(&record.address)
    }
}

impl From<Url> for UrlRecord {
    fn from(url: Url) -> Self {
        UrlRecord {
            domain: url.domain().map(str::to_string),
            address: url.as_str().to_string(),
        }
    }
}
