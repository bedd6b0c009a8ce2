//! HTML reference extraction
//!
//! This module reads an already parsed document and returns:
//! - Links to follow (`<a href>` and `<meta http-equiv="refresh">` targets)
//! - Assets (`<link href>`, `<script src>`, `<img src>`)
//! - The title and whether the page shows any visible text

use crate::url::{full_url_address, Url};
use scraper::{Html, Node, Selector};

/// Elements whose text is never rendered
const HIDDEN_TEXT_PARENTS: &[&str] = &["style", "script", "head", "title", "meta"];

/// Title prefixes of server-generated directory listings
const INDEX_TITLES: &[&str] = &["index of", "directory listing for"];

/// Resolves the `attribute` of every element matched by `selector`
fn attribute_references(document: &Html, selector: &str, attribute: &str, base: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attribute))
        .filter_map(|reference| full_url_address(reference, base))
        .collect()
}

/// Stylesheets, scripts and images referenced by the page
pub fn asset_references(document: &Html, base: &Url) -> Vec<Url> {
    let mut assets = attribute_references(document, "link[href]", "href", base);
    assets.extend(attribute_references(document, "script[src]", "src", base));
    assets.extend(attribute_references(document, "img[src]", "src", base));
    assets
}

/// Anchor targets plus meta refresh destinations
///
/// # Example
///
/// ```no_run
/// use dirhunt::processors::html::link_references;
/// use dirhunt::Url;
/// use scraper::Html;
///
/// let document = Html::parse_document(
///     r#"<meta http-equiv="refresh" content="0;URL=/moved"><a href="dir/">dir</a>"#,
/// );
/// let links = link_references(&document, &Url::new("http://example.com/"));
/// assert_eq!(links.len(), 2);
/// ```
pub fn link_references(document: &Html, base: &Url) -> Vec<Url> {
    let mut links = attribute_references(document, "a[href]", "href", base);

    if let Ok(meta_selector) = Selector::parse("meta[http-equiv][content]") {
        for meta in document.select(&meta_selector) {
            let element = meta.value();
            let is_refresh = element
                .attr("http-equiv")
                .is_some_and(|value| value.eq_ignore_ascii_case("refresh"));
            if !is_refresh {
                continue;
            }
            let target = element
                .attr("content")
                .and_then(|content| content.split_once('='))
                .map(|(_, target)| target);
            if let Some(url) = target.and_then(|target| full_url_address(target, base)) {
                links.push(url);
            }
        }
    }

    links
}

/// Trimmed text of the first `<title>`
pub fn title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

/// Returns true if the title announces a directory listing
pub fn has_index_title(document: &Html) -> bool {
    title(document).is_some_and(|title| {
        let title = title.to_lowercase();
        INDEX_TITLES.iter().any(|prefix| title.starts_with(prefix))
    })
}

/// Returns true if no visible element holds non-whitespace text
pub fn is_blank(document: &Html) -> bool {
    !document.tree.nodes().any(|node| {
        let Node::Text(text) = node.value() else {
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }
        node.parent()
            .and_then(|parent| parent.value().as_element().map(|element| element.name()))
            .is_some_and(|name| !HIDDEN_TEXT_PARENTS.contains(&name))
    })
}
