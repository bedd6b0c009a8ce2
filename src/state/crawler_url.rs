//! Per-target crawl record
//!
//! A `CrawlerUrl` carries the remaining recursion budget, the inferred type,
//! the existence signal and the classification flags of one address. It is
//! only ever mutated by the task processing it.

use crate::url::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// File names probed under every directory
pub const INDEX_FILES: &[&str] = &["index.php", "index.html", "index.htm"];

/// Importance of each flag when ranking results
pub const FLAGS_WEIGHT: &[(&str, f64)] = &[("blank", 4.0), ("not_found.fake", 3.0), ("html", 2.0)];

/// Weight removed per ancestor directory
const BREADCRUMB_PENALTY: f64 = 1.5;

/// Inferred kind of resource behind a URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    #[default]
    Unknown,
    Directory,
    Document,
    Asset,
    IndexFile,
    /// A page served through URL rewriting (CMS front controller)
    Rewrite,
}

impl UrlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Directory => "directory",
            Self::Document => "document",
            Self::Asset => "asset",
            Self::IndexFile => "index_file",
            Self::Rewrite => "rewrite",
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a `CrawlerUrl` came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Origin {
    #[default]
    Seed,
    /// Found while processing the given page
    Page(String),
    /// Ancestor directory of the given URL
    Breadcrumb(String),
    /// Index file probe under the given directory
    IndexProbe(String),
    /// Yielded by a passive source
    Source(&'static str),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed => write!(f, "seed"),
            Self::Page(url) => write!(f, "page {}", url),
            Self::Breadcrumb(url) => write!(f, "breadcrumb of {}", url),
            Self::IndexProbe(url) => write!(f, "index probe of {}", url),
            Self::Source(name) => write!(f, "source {}", name),
        }
    }
}

/// The mutable crawl record of one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerUrl {
    pub url: Url,

    /// Remaining recursion budget
    pub depth: i32,

    #[serde(rename = "type")]
    pub url_type: UrlType,

    /// `None` until a response or a trusted source settles it
    pub exists: Option<bool>,

    pub flags: BTreeSet<String>,

    #[serde(skip)]
    pub origin: Origin,
}

impl CrawlerUrl {
    /// Creates a record with query and fragment stripped from `url`
    ///
    /// A URL whose path is empty or `/` is typed as a directory straight away.
    pub fn new(mut url: Url, depth: i32) -> Self {
        let mut url_type = UrlType::Unknown;
        if url.is_valid() {
            url.set_query(None);
            url.set_fragment(None);
            if url.path().is_empty() || url.path() == "/" {
                url_type = UrlType::Directory;
            }
        }
        Self {
            url,
            depth,
            url_type,
            exists: None,
            flags: BTreeSet::new(),
            origin: Origin::Seed,
        }
    }

    /// Sets the type; an untyped value never downgrades a directory
    pub fn with_type(mut self, url_type: UrlType) -> Self {
        if self.url_type != UrlType::Directory || url_type != UrlType::Unknown {
            self.url_type = url_type;
        }
        self
    }

    pub fn with_exists(mut self, exists: Option<bool>) -> Self {
        self.exists = exists;
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Key under which the record is tracked
    pub fn key(&self) -> &str {
        self.url.as_str()
    }

    /// Narrows an unknown type from the response Content-Type
    pub fn set_type(&mut self, content_type: Option<&str>) {
        if self.url_type != UrlType::Unknown {
            return;
        }
        let is_html = content_type.is_some_and(|value| value.starts_with("text/html"));
        if !is_html {
            self.url_type = UrlType::Asset;
        } else if INDEX_FILES.contains(&self.url.name()) {
            self.url_type = UrlType::Document;
        }
    }

    /// True unless the URL is known to be a real directory or a static asset
    pub fn maybe_rewrite(&self) -> bool {
        !matches!(self.url_type, UrlType::Asset | UrlType::Directory)
    }

    /// True while the URL may still turn out to be a directory
    pub fn maybe_directory(&self) -> bool {
        matches!(self.url_type, UrlType::Unknown | UrlType::Directory)
    }

    /// Ranking score: sum of flag weights minus a penalty per ancestor
    pub fn weight(&self) -> f64 {
        let flags: f64 = self
            .flags
            .iter()
            .filter_map(|flag| {
                FLAGS_WEIGHT
                    .iter()
                    .find(|(name, _)| *name == flag.as_str())
                    .map(|(_, weight)| weight)
            })
            .sum();
        let depth = if self.url.is_valid() {
            self.url.breadcrumb().count() as f64
        } else {
            0.0
        };
        flags - depth * BREADCRUMB_PENALTY
    }

    /// Ancestor directories to enqueue once this URL has been processed
    ///
    /// A URL known to be a real directory or asset proves that its ancestors
    /// exist and are directories; anything else might be rewritten and
    /// proves nothing.
    pub fn self_directories(&self) -> Vec<CrawlerUrl> {
        let rewrite = self.maybe_rewrite();
        let exists = (!rewrite && self.exists == Some(true)).then_some(true);
        let url_type = if rewrite {
            UrlType::Unknown
        } else {
            UrlType::Directory
        };
        self.url
            .breadcrumb()
            .map(|url| {
                CrawlerUrl::new(url, self.depth - 1)
                    .with_type(url_type)
                    .with_exists(exists)
                    .with_origin(Origin::Breadcrumb(self.key().to_string()))
            })
            .collect()
    }

    /// Index file candidates for a directory or untyped URL
    pub fn index_probes(&self) -> Vec<CrawlerUrl> {
        if !matches!(self.url_type, UrlType::Directory | UrlType::Unknown) {
            return Vec::new();
        }
        INDEX_FILES
            .iter()
            .map(|name| {
                CrawlerUrl::new(self.url.child(name), self.depth - 1)
                    .with_type(UrlType::IndexFile)
                    .with_origin(Origin::IndexProbe(self.key().to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler_url(address: &str) -> CrawlerUrl {
        CrawlerUrl::new(Url::new(address), 3)
    }

    #[test]
    fn test_new_strips_query_and_fragment() {
        let crawler_url = crawler_url("http://example.com/a/b.php?id=1#top");
        assert_eq!(crawler_url.key(), "http://example.com/a/b.php");
    }

    #[test]
    fn test_root_is_directory() {
        assert_eq!(crawler_url("http://example.com").url_type, UrlType::Directory);
        assert_eq!(crawler_url("http://example.com/").url_type, UrlType::Directory);
        assert_eq!(crawler_url("http://example.com/a").url_type, UrlType::Unknown);
    }

    #[test]
    fn test_root_keeps_directory_type() {
        let crawler_url = crawler_url("http://example.com/").with_type(UrlType::Unknown);
        assert_eq!(crawler_url.url_type, UrlType::Directory);
    }

    #[test]
    fn test_set_type_non_html_is_asset() {
        let mut crawler_url = crawler_url("http://example.com/logo.png");
        crawler_url.set_type(Some("image/png"));
        assert_eq!(crawler_url.url_type, UrlType::Asset);

        let mut crawler_url = self::crawler_url("http://example.com/x");
        crawler_url.set_type(None);
        assert_eq!(crawler_url.url_type, UrlType::Asset);
    }

    #[test]
    fn test_set_type_index_file_is_document() {
        let mut crawler_url = crawler_url("http://example.com/dir/index.php");
        crawler_url.set_type(Some("text/html; charset=utf-8"));
        assert_eq!(crawler_url.url_type, UrlType::Document);
    }

    #[test]
    fn test_set_type_keeps_known_type() {
        let mut crawler_url = crawler_url("http://example.com/dir/").with_type(UrlType::Directory);
        crawler_url.set_type(Some("image/png"));
        assert_eq!(crawler_url.url_type, UrlType::Directory);
    }

    #[test]
    fn test_maybe_directory() {
        assert!(crawler_url("http://example.com/a").maybe_directory());
        assert!(crawler_url("http://example.com/").maybe_directory());
        for url_type in [UrlType::Asset, UrlType::Document, UrlType::Rewrite, UrlType::IndexFile] {
            assert!(!crawler_url("http://example.com/a")
                .with_type(url_type)
                .maybe_directory());
        }
    }

    #[test]
    fn test_weight_ordering() {
        let mut blank = crawler_url("http://example.com/a/");
        blank.flags.insert("blank".to_string());
        let mut html = crawler_url("http://example.com/b/");
        html.flags.insert("html".to_string());
        assert_eq!(blank.weight(), 4.0 - 1.5);
        assert_eq!(html.weight(), 2.0 - 1.5);
        assert!(blank.weight() > html.weight());
    }

    #[test]
    fn test_weight_penalizes_depth() {
        let mut shallow = crawler_url("http://example.com/a/");
        shallow.flags.insert("200".to_string());
        let mut deep = crawler_url("http://example.com/a/b/c/");
        deep.flags.insert("200".to_string());
        assert!(shallow.weight() > deep.weight());
        assert_eq!(crawler_url("http://example.com/").weight(), 0.0);
    }

    #[test]
    fn test_self_directories_of_existing_directory() {
        let mut crawler_url = crawler_url("http://example.com/a/b/").with_type(UrlType::Directory);
        crawler_url.exists = Some(true);
        let parents = crawler_url.self_directories();
        let addresses: Vec<&str> = parents.iter().map(|parent| parent.key()).collect();
        assert_eq!(addresses, vec!["http://example.com/", "http://example.com/a/"]);
        assert!(parents.iter().all(|parent| parent.exists == Some(true)));
        assert!(parents.iter().all(|parent| parent.url_type == UrlType::Directory));
        assert!(parents.iter().all(|parent| parent.depth == 2));
    }

    #[test]
    fn test_self_directories_of_possible_rewrite() {
        let mut crawler_url = crawler_url("http://example.com/blog/post");
        crawler_url.exists = Some(true);
        let parents = crawler_url.self_directories();
        assert_eq!(parents.len(), 2);
        assert!(parents.iter().all(|parent| parent.exists.is_none()));
        assert_eq!(parents[1].url_type, UrlType::Unknown);
        // The root is always a directory
        assert_eq!(parents[0].url_type, UrlType::Directory);
    }

    #[test]
    fn test_index_probes() {
        let crawler_url = crawler_url("http://example.com/dir/");
        let probes = crawler_url.index_probes();
        let addresses: Vec<&str> = probes.iter().map(|probe| probe.key()).collect();
        assert_eq!(
            addresses,
            vec![
                "http://example.com/dir/index.php",
                "http://example.com/dir/index.html",
                "http://example.com/dir/index.htm",
            ]
        );
        assert!(probes.iter().all(|probe| probe.url_type == UrlType::IndexFile));
        assert!(probes.iter().all(|probe| probe.depth == 2));
    }

    #[test]
    fn test_no_index_probes_for_assets() {
        let crawler_url = crawler_url("http://example.com/app.js").with_type(UrlType::Asset);
        assert!(crawler_url.index_probes().is_empty());
    }

    #[test]
    fn test_serialized_form() {
        let mut crawler_url = crawler_url("http://example.com/a/");
        crawler_url.flags.insert("200".to_string());
        let json = serde_json::to_value(&crawler_url).unwrap();
        assert_eq!(json["depth"], 3);
        assert_eq!(json["type"], "unknown");
        assert_eq!(json["exists"], serde_json::Value::Null);
        assert_eq!(json["flags"][0], "200");
        assert_eq!(json["url"]["address"], "http://example.com/a/");
        assert_eq!(json["url"]["domain"], "example.com");
    }
}
