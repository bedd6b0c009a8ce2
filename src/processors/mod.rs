//! Response classification and URL discovery
//!
//! Given a completed exchange for a `CrawlerUrl`, exactly one processor
//! applies: the first entry of `CATALOGUE` whose predicate accepts the
//! exchange. The chosen handler extracts further URLs and returns them to the
//! caller instead of submitting them itself.
//!
//! | Order | Processor | Applies when |
//! |-------|-----------|--------------|
//! | 1 | Redirect | 300 <= status < 400 |
//! | 2 | NotFound | status == 404 |
//! | 3 | CssStyleSheet | `text/css`, status < 300 |
//! | 4 | JavaScript | `application/javascript`, status < 300 |
//! | 5 | IndexOf | Html applies and the title announces a listing |
//! | 6 | BlankPage | Html applies and no visible text |
//! | 7 | Html | `text/html`, status < 300, body available |
//! | 8 | Generic | always |

mod assets;
mod directory_list;
pub mod html;

pub use assets::{css_references, js_references};
pub use directory_list::{DirectoryList, ListingEntry, ListingMetadata};

use crate::config::{Config, INTERESTING_EXTENSIONS, INTERESTING_FILES};
use crate::state::{CrawlerUrl, Origin, UrlType};
use crate::url::{full_url_address, is_url_loop, Url};
use scraper::Html;
use std::collections::BTreeSet;
use std::fmt;

/// Closed set of processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessorKind {
    Redirect,
    NotFound,
    CssStyleSheet,
    JavaScript,
    IndexOf,
    BlankPage,
    Html,
    Generic,
    Error,
}

impl ProcessorKind {
    /// Every kind, in catalogue order with `Error` last
    pub const ALL: [ProcessorKind; 9] = [
        Self::Redirect,
        Self::NotFound,
        Self::CssStyleSheet,
        Self::JavaScript,
        Self::IndexOf,
        Self::BlankPage,
        Self::Html,
        Self::Generic,
        Self::Error,
    ];

    /// Flag contributed by every result of this kind
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::Redirect => "redirect",
            Self::NotFound => "not_found",
            Self::CssStyleSheet => "css",
            Self::JavaScript => "js",
            Self::IndexOf => "index_of",
            Self::BlankPage => "blank",
            Self::Html => "html",
            Self::Generic => "generic",
            Self::Error => "error",
        }
    }

    /// Human readable name used in result lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::Redirect => "Redirect",
            Self::NotFound => "Not Found",
            Self::CssStyleSheet => "CSS StyleSheet",
            Self::JavaScript => "JavaScript",
            Self::IndexOf => "Index Of",
            Self::BlankPage => "Blank page",
            Self::Html => "HTML document",
            Self::Generic => "Generic",
            Self::Error => "Error",
        }
    }

    /// Identifier stored in report files
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Redirect => "Redirect",
            Self::NotFound => "NotFound",
            Self::CssStyleSheet => "CssStyleSheet",
            Self::JavaScript => "JavaScript",
            Self::IndexOf => "IndexOf",
            Self::BlankPage => "BlankPage",
            Self::Html => "Html",
            Self::Generic => "Generic",
            Self::Error => "Error",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.class_name() == name)
    }

    /// Processors that look for index files under the URL afterwards
    pub fn probes_index(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::BlankPage | Self::Html | Self::Generic
        )
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A processor together with what it found
#[derive(Debug, Clone, PartialEq)]
pub enum Processor {
    Redirect { target: Option<Url> },
    NotFound,
    CssStyleSheet,
    JavaScript,
    IndexOf { files: Vec<ListingEntry> },
    BlankPage,
    Html,
    Generic,
    /// Built from a failed fetch rather than selected
    Error { message: String },
}

impl Processor {
    pub fn kind(&self) -> ProcessorKind {
        match self {
            Self::Redirect { .. } => ProcessorKind::Redirect,
            Self::NotFound => ProcessorKind::NotFound,
            Self::CssStyleSheet => ProcessorKind::CssStyleSheet,
            Self::JavaScript => ProcessorKind::JavaScript,
            Self::IndexOf { .. } => ProcessorKind::IndexOf,
            Self::BlankPage => ProcessorKind::BlankPage,
            Self::Html => ProcessorKind::Html,
            Self::Generic => ProcessorKind::Generic,
            Self::Error { .. } => ProcessorKind::Error,
        }
    }

    /// Payload-free processor of the given kind, used when restoring reports
    pub fn restored(kind: ProcessorKind) -> Self {
        match kind {
            ProcessorKind::Redirect => Self::Redirect { target: None },
            ProcessorKind::NotFound => Self::NotFound,
            ProcessorKind::CssStyleSheet => Self::CssStyleSheet,
            ProcessorKind::JavaScript => Self::JavaScript,
            ProcessorKind::IndexOf => Self::IndexOf { files: Vec::new() },
            ProcessorKind::BlankPage => Self::BlankPage,
            ProcessorKind::Html => Self::Html,
            ProcessorKind::Generic => Self::Generic,
            ProcessorKind::Error => Self::Error {
                message: String::new(),
            },
        }
    }

    /// Classification flags contributed to the processed URL
    pub fn flags(&self, crawler_url: &CrawlerUrl, settings: &ProcessSettings) -> BTreeSet<String> {
        let key = self.kind().key_name();
        let mut flags = BTreeSet::from([key.to_string()]);
        match self {
            Self::NotFound if crawler_url.exists == Some(true) => {
                flags.insert(format!("{}.fake", key));
            }
            Self::IndexOf { files } if interesting_files(files, settings).is_empty() => {
                flags.insert(format!("{}.nothing", key));
            }
            _ => {}
        }
        flags
    }
}

/// Listing entries whose extension or file name is interesting
pub fn interesting_files<'a>(
    files: &'a [ListingEntry],
    settings: &ProcessSettings,
) -> Vec<&'a ListingEntry> {
    files
        .iter()
        .filter(|entry| {
            let name = entry.url.name();
            let extension = name.rsplit_once('.').map(|(_, extension)| extension);
            extension.is_some_and(|extension| {
                settings
                    .interesting_extensions
                    .iter()
                    .any(|interesting| interesting == extension)
            }) || settings.interesting_files.iter().any(|interesting| interesting == name)
        })
        .collect()
}

/// A completed HTTP exchange
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub status: u16,
    pub content_type: Option<String>,
    /// `Location` header
    pub location: Option<String>,
    /// Body, present only when it was read
    pub body: Option<String>,
}

impl Page {
    fn content_type_starts_with(&self, prefix: &str) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.to_ascii_lowercase().starts_with(prefix))
    }
}

/// Crawl settings the processors depend on
#[derive(Debug, Clone)]
pub struct ProcessSettings {
    pub follow_redirects: bool,
    pub interesting_extensions: Vec<String>,
    pub interesting_files: Vec<String>,
    pub interesting_keywords: Vec<String>,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            interesting_extensions: INTERESTING_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            interesting_files: INTERESTING_FILES.iter().map(|s| s.to_string()).collect(),
            interesting_keywords: Vec::new(),
        }
    }
}

impl From<&Config> for ProcessSettings {
    fn from(config: &Config) -> Self {
        Self {
            follow_redirects: config.crawler.follow_redirects,
            interesting_extensions: config.filters.interesting_extensions.clone(),
            interesting_files: config.filters.interesting_files.clone(),
            interesting_keywords: config.filters.interesting_keywords.clone(),
        }
    }
}

/// Output of running the catalogue over one exchange
#[derive(Debug)]
pub struct Processing {
    pub processor: Processor,
    pub discoveries: Vec<CrawlerUrl>,
    pub keywords_found: BTreeSet<String>,
}

/// State shared by a predicate match and its handler
struct Exchange<'a> {
    crawler_url: &'a mut CrawlerUrl,
    page: &'a Page,
    document: Option<&'a Html>,
    settings: &'a ProcessSettings,
    discoveries: Vec<CrawlerUrl>,
}

impl Exchange<'_> {
    fn discover(&mut self, url: Url, depth: i32, url_type: UrlType) {
        if is_url_loop(&url) {
            tracing::debug!("Skipping looping URL {}", url);
            return;
        }
        let origin = Origin::Page(self.crawler_url.key().to_string());
        self.discoveries.push(
            CrawlerUrl::new(url, depth)
                .with_type(url_type)
                .with_origin(origin),
        );
    }

    /// Keeps the parent's depth inside its own directory, otherwise spends one level
    ///
    /// Another port on the same host counts as leaving the directory.
    fn link_depth(&self, target: &Url) -> i32 {
        let parent = &self.crawler_url.url;
        if target.domain_port() == parent.domain_port()
            && target.path().starts_with(&parent.directory_path())
        {
            self.crawler_url.depth
        } else {
            self.crawler_url.depth - 1
        }
    }

    fn discover_link(&mut self, url: Url, url_type: UrlType) {
        let depth = self.link_depth(&url);
        if depth > 0 {
            self.discover(url, depth, url_type);
        }
    }

    /// Marks CMS pages so they are not mistaken for real directories
    fn analyze_asset(&mut self, asset: &Url) {
        let crawler_url = &mut *self.crawler_url;
        if crawler_url.flags.contains("wordpress") || !asset.path().contains("wp-content") {
            return;
        }
        crawler_url.flags.insert("wordpress".to_string());
        if crawler_url.url_type != UrlType::Directory {
            crawler_url.url_type = UrlType::Rewrite;
        }
        crawler_url.depth -= 1;
    }
}

type Predicate = fn(&Page, Option<&Html>) -> bool;
type Handler = fn(&mut Exchange<'_>) -> Processor;

struct CatalogueEntry {
    kind: ProcessorKind,
    applies: Predicate,
    handle: Handler,
}

/// Processors in priority order; the first match wins
const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        kind: ProcessorKind::Redirect,
        applies: is_redirect,
        handle: handle_redirect,
    },
    CatalogueEntry {
        kind: ProcessorKind::NotFound,
        applies: is_not_found,
        handle: handle_not_found,
    },
    CatalogueEntry {
        kind: ProcessorKind::CssStyleSheet,
        applies: is_css,
        handle: handle_css,
    },
    CatalogueEntry {
        kind: ProcessorKind::JavaScript,
        applies: is_javascript,
        handle: handle_javascript,
    },
    CatalogueEntry {
        kind: ProcessorKind::IndexOf,
        applies: is_index_of,
        handle: handle_index_of,
    },
    CatalogueEntry {
        kind: ProcessorKind::BlankPage,
        applies: is_blank_page,
        handle: handle_blank_page,
    },
    CatalogueEntry {
        kind: ProcessorKind::Html,
        applies: is_html,
        handle: handle_html,
    },
    CatalogueEntry {
        kind: ProcessorKind::Generic,
        applies: |_, _| true,
        handle: |_| Processor::Generic,
    },
];

fn is_redirect(page: &Page, _: Option<&Html>) -> bool {
    (300..400).contains(&page.status)
}

fn is_not_found(page: &Page, _: Option<&Html>) -> bool {
    page.status == 404
}

fn is_css(page: &Page, _: Option<&Html>) -> bool {
    page.status < 300 && page.content_type_starts_with("text/css")
}

fn is_javascript(page: &Page, _: Option<&Html>) -> bool {
    page.status < 300 && page.content_type_starts_with("application/javascript")
}

fn is_html(page: &Page, document: Option<&Html>) -> bool {
    page.status < 300 && page.content_type_starts_with("text/html") && document.is_some()
}

fn is_index_of(page: &Page, document: Option<&Html>) -> bool {
    is_html(page, document) && document.is_some_and(html::has_index_title)
}

fn is_blank_page(page: &Page, document: Option<&Html>) -> bool {
    is_html(page, document) && document.is_some_and(html::is_blank)
}

fn handle_redirect(exchange: &mut Exchange<'_>) -> Processor {
    let target = exchange
        .page
        .location
        .as_deref()
        .and_then(|location| full_url_address(location, &exchange.crawler_url.url));
    if let Some(target) = &target {
        if exchange.settings.follow_redirects {
            let depth = exchange.crawler_url.depth;
            exchange.discover(target.clone(), depth, UrlType::Unknown);
        }
    }
    Processor::Redirect { target }
}

fn handle_not_found(_: &mut Exchange<'_>) -> Processor {
    Processor::NotFound
}

fn handle_css(exchange: &mut Exchange<'_>) -> Processor {
    if let Some(body) = exchange.page.body.as_deref() {
        for url in css_references(body, &exchange.crawler_url.url) {
            exchange.discover(url, 0, UrlType::Asset);
        }
    }
    Processor::CssStyleSheet
}

fn handle_javascript(exchange: &mut Exchange<'_>) -> Processor {
    if let Some(body) = exchange.page.body.as_deref() {
        for url in js_references(body, &exchange.crawler_url.url) {
            exchange.discover(url, 0, UrlType::Asset);
        }
    }
    Processor::JavaScript
}

fn handle_index_of(exchange: &mut Exchange<'_>) -> Processor {
    let Some(document) = exchange.document else {
        return Processor::IndexOf { files: Vec::new() };
    };
    let files = DirectoryList::detect(document).get_links(document, &exchange.crawler_url.url);
    for entry in files.iter().filter(|entry| entry.is_directory()) {
        exchange.discover_link(entry.url.clone(), UrlType::Directory);
    }
    Processor::IndexOf { files }
}

/// Assets first: a CMS marker lowers the depth links are followed with
fn extract_html_references(exchange: &mut Exchange<'_>) {
    let Some(document) = exchange.document else {
        return;
    };
    let base = exchange.crawler_url.url.clone();
    for asset in html::asset_references(document, &base) {
        exchange.analyze_asset(&asset);
        let depth = exchange.crawler_url.depth;
        exchange.discover(asset, depth, UrlType::Asset);
    }
    for link in html::link_references(document, &base) {
        exchange.discover_link(link, UrlType::Unknown);
    }
}

fn handle_blank_page(exchange: &mut Exchange<'_>) -> Processor {
    extract_html_references(exchange);
    Processor::BlankPage
}

fn handle_html(exchange: &mut Exchange<'_>) -> Processor {
    extract_html_references(exchange);
    Processor::Html
}

/// Picks the processor for an exchange without running it
pub fn select(page: &Page, document: Option<&Html>) -> ProcessorKind {
    CATALOGUE
        .iter()
        .find(|entry| (entry.applies)(page, document))
        .map(|entry| entry.kind)
        .unwrap_or(ProcessorKind::Generic)
}

/// Classifies an exchange and collects the URLs it reveals
///
/// The HTML document is parsed here and dropped before returning, so the
/// caller never holds it across an await point.
///
/// # Arguments
///
/// * `crawler_url` - The record being processed; its type, flags and depth may change
/// * `page` - The exchange
/// * `settings` - Redirect and interesting-content settings
///
/// # Returns
///
/// The selected processor, the discovered URLs and any interesting keywords found
pub fn process(crawler_url: &mut CrawlerUrl, page: &Page, settings: &ProcessSettings) -> Processing {
    let document = page
        .body
        .as_deref()
        .filter(|_| page.content_type_starts_with("text/html"))
        .map(Html::parse_document);

    let keywords_found = page
        .body
        .as_deref()
        .map(|body| search_keywords(body, &settings.interesting_keywords))
        .unwrap_or_default();

    let mut exchange = Exchange {
        crawler_url,
        page,
        document: document.as_ref(),
        settings,
        discoveries: Vec::new(),
    };
    let processor = CATALOGUE
        .iter()
        .find(|entry| (entry.applies)(exchange.page, exchange.document))
        .map(|entry| (entry.handle)(&mut exchange))
        .unwrap_or(Processor::Generic);

    Processing {
        processor,
        discoveries: exchange.discoveries,
        keywords_found,
    }
}

fn search_keywords(text: &str, keywords: &[String]) -> BTreeSet<String> {
    keywords
        .iter()
        .filter(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
        .cloned()
        .collect()
}

/// The outcome recorded for a processed URL
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub processor: Processor,
    /// `None` when no response was received
    pub status_code: Option<u16>,
    pub crawler_url: CrawlerUrl,
    pub index_file: Option<Url>,
    pub keywords_found: BTreeSet<String>,
}

impl CrawlResult {
    pub fn new(processor: Processor, status_code: Option<u16>, crawler_url: CrawlerUrl) -> Self {
        Self {
            processor,
            status_code,
            crawler_url,
            index_file: None,
            keywords_found: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> ProcessorKind {
        self.processor.kind()
    }

    pub fn is_error(&self) -> bool {
        self.kind() == ProcessorKind::Error
    }

    /// One-line description used in live output and reports
    pub fn line(&self) -> String {
        let status = match self.status_code {
            Some(code) => code.to_string(),
            None => "ERR".to_string(),
        };
        let mut line = format!("[{}] {}  ({})", status, self.crawler_url.url, self.kind());
        match &self.processor {
            Processor::Redirect {
                target: Some(target),
            } => line.push_str(&format!(" -> {}", target)),
            Processor::IndexOf { files } if !files.is_empty() => {
                line.push_str(&format!(" {} entries", files.len()));
            }
            Processor::Error { message } if !message.is_empty() => {
                line.push_str(&format!(": {}", message));
            }
            _ => {}
        }
        if let Some(index_file) = &self.index_file {
            line.push_str(&format!("  Index file found: {}", index_file.name()));
        }
        if !self.keywords_found.is_empty() {
            let keywords: Vec<&str> = self.keywords_found.iter().map(String::as_str).collect();
            line.push_str(&format!("  Keywords found: {}", keywords.join(", ")));
        }
        line
    }
}
