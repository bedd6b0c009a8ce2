//! Directory listing parsers
//!
//! Server-generated index pages come in a structured Apache flavour, where
//! each entry is followed by its modification date and size, and anything
//! else, where only the anchors are usable.

use crate::url::{full_url_address, Url};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DATETIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2} +\d{2}:\d{2}(?::\d{2}|))")
        .expect("hardcoded regex pattern is valid")
});

static FILESIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)([\d]+\.?[\d]{0,3} ?[ptgmkb]?i?b?) *$")
        .expect("hardcoded regex pattern is valid")
});

/// Metadata printed next to a listing entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<String>,
}

/// A child of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub url: Url,
    #[serde(default)]
    pub extra: ListingMetadata,
}

impl ListingEntry {
    /// Returns true for entries that look like subdirectories
    pub fn is_directory(&self) -> bool {
        self.url.path().ends_with('/')
    }
}

/// Listing flavours, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryList {
    Apache,
    Common,
}

impl DirectoryList {
    /// Picks the first parser that understands the document
    pub fn detect(document: &Html) -> Self {
        if is_apache_listing(document) {
            Self::Apache
        } else {
            Self::Common
        }
    }

    /// Extracts the children of the listing, resolved against `base`
    pub fn get_links(&self, document: &Html, base: &Url) -> Vec<ListingEntry> {
        match self {
            Self::Apache => apache_links(document, base),
            Self::Common => common_links(document, base),
        }
    }
}

fn has_match(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false)
}

fn is_apache_listing(document: &Html) -> bool {
    has_match(document, "pre")
        && has_match(document, "pre > a")
        && has_match(document, r#"a[href="?C=N;O=D"]"#)
}

/// Walks the `<pre>` block, pairing each anchor with the text that follows it
fn apache_links(document: &Html, base: &Url) -> Vec<ListingEntry> {
    let Ok(pre_selector) = Selector::parse("pre") else {
        return Vec::new();
    };
    let Some(pre) = document.select(&pre_selector).next() else {
        return Vec::new();
    };

    // Text nodes and anchors only; icons and rules are noise
    let contents: Vec<_> = pre
        .children()
        .filter(|node| match node.value() {
            Node::Text(_) => true,
            Node::Element(element) => element.name() == "a",
            _ => false,
        })
        .collect();

    let mut entries = Vec::new();
    for (index, node) in contents.iter().enumerate() {
        let Some(anchor) = ElementRef::wrap(*node) else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        // Column sorting links
        if href.contains('?') {
            continue;
        }
        let Some(url) = full_url_address(href, base) else {
            continue;
        };
        let extra = contents
            .get(index + 1)
            .and_then(|next| match next.value() {
                Node::Text(text) => Some(parse_metadata(text)),
                _ => None,
            })
            .unwrap_or_default();
        entries.push(ListingEntry { url, extra });
    }
    entries
}

fn parse_metadata(text: &str) -> ListingMetadata {
    ListingMetadata {
        created_at: DATETIME_REGEX
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_string()),
        filesize: FILESIZE_REGEX
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim_end_matches(' ').to_string()),
    }
}

fn common_links(document: &Html, base: &Url) -> Vec<ListingEntry> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| full_url_address(href, base))
        .map(|url| ListingEntry {
            url,
            extra: ListingMetadata::default(),
        })
        .collect()
}
