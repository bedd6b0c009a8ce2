//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use dirhunt::config::Config;
use dirhunt::output::load_snapshot;
use dirhunt::sources::{Source, SourceError, Sources};
use dirhunt::state::Origin;
use dirhunt::{CrawlReport, Crawler, DirhuntError, ProcessorKind, ResumeError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the given seed
fn create_test_config(seed: &str) -> Config {
    let mut config = Config::default();
    config.urls = vec![seed.to_string()];
    config.crawler.retries = 0;
    config.crawler.timeout = 5;
    config.output.progress = false;
    config
}

async fn run(config: Config) -> Result<CrawlReport, DirhuntError> {
    run_with_sources(config, Sources::none()).await
}

async fn run_with_sources(config: Config, sources: Sources) -> Result<CrawlReport, DirhuntError> {
    Crawler::with_sources(config, sources)?
        .with_retry_delay(Duration::from_millis(10))
        .run()
        .await
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

/// Mounts a small site; anything not mounted answers 404
///
/// ```text
/// /            links to /admin/ (twice), /files/ and /old
/// /admin/      blank page
/// /files/      directory listing with backup.zip and sub/
/// /files/sub/  plain page
/// /files/backup.zip  short text body
/// /old         301 to /new/
/// /new/        plain page
/// ```
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><h1>Home</h1>
            <a href="/admin/">Admin</a>
            <a href="admin/">Admin again</a>
            <a href="/files/">Files</a>
            <a href="/old">Old</a></body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/"))
        .respond_with(html("<html><head><title></title></head><body></body></html>"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/"))
        .respond_with(html(
            r#"<html><head><title>Index of /files</title></head><body>
            <h1>Index of /files</h1>
            <ul>
            <li><a href="/"> Parent Directory</a></li>
            <li><a href="backup.zip"> backup.zip</a></li>
            <li><a href="sub/"> sub/</a></li>
            </ul></body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/sub/"))
        .respond_with(html("<html><body>Nested</body></html>"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/backup.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("PK backup archive", "application/zip"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new/"))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new/"))
        .respond_with(html("<html><body>Moved here</body></html>"))
        .expect(1)
        .mount(server)
        .await;
}

fn kind_of(report: &CrawlReport, address: &str) -> Option<ProcessorKind> {
    report.get(address).map(|result| result.kind())
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let report = run(create_test_config(&format!("{}/", base)))
        .await
        .expect("crawl failed");

    assert!(!report.limit_reached);
    assert!(!report.aborted);
    assert!(report.snapshot.is_none());

    let at = |path: &str| format!("{}{}", base, path);
    assert_eq!(kind_of(&report, &at("/")), Some(ProcessorKind::Html));
    assert_eq!(kind_of(&report, &at("/admin/")), Some(ProcessorKind::BlankPage));
    assert_eq!(kind_of(&report, &at("/files/")), Some(ProcessorKind::IndexOf));
    assert_eq!(kind_of(&report, &at("/files/sub/")), Some(ProcessorKind::Html));
    assert_eq!(kind_of(&report, &at("/old")), Some(ProcessorKind::Redirect));
    assert_eq!(kind_of(&report, &at("/new/")), Some(ProcessorKind::Html));

    // Index file candidates are probed and answered 404
    assert_eq!(kind_of(&report, &at("/index.php")), Some(ProcessorKind::NotFound));
    assert_eq!(kind_of(&report, &at("/admin/index.html")), Some(ProcessorKind::NotFound));

    // Listed files are not crawled, only fetched once the crawl settles
    assert!(report.get(&at("/files/backup.zip")).is_none());
    let files = &report.interesting_files;
    assert_eq!(files.files.len(), 1);
    assert_eq!(files.files[0].entry.url.as_str(), at("/files/backup.zip"));
    assert_eq!(files.files[0].status, 200);
    assert_eq!(files.files[0].size, 17);
    assert_eq!(files.files[0].text, "PK backup archive");
    assert_eq!(files.errors, 0);

    let admin = report.get(&at("/admin/")).unwrap();
    assert!(admin.crawler_url.flags.contains("200"));
    assert!(admin.crawler_url.flags.contains("blank"));
    assert_eq!(admin.crawler_url.exists, Some(true));

    let old = report.get(&at("/old")).unwrap();
    assert_eq!(old.status_code, Some(301));
    assert!(old.line().contains(&at("/new/")));

    assert_eq!(report.processed_count, report.results.len());
    assert_eq!(report.statistics.total_processed, report.results.len());
    assert_eq!(report.statistics.errors, 0);
    assert_eq!(report.domains.len(), 1);

    // Every page fetched exactly once
    server.verify().await;
}

#[tokio::test]
async fn test_depth_exhaustion() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a/"))
        .respond_with(html(r#"<html><body>A <a href="/b/">B</a></body></html>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b/"))
        .respond_with(html("<html><body>B</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/a/", server.uri()));
    config.crawler.max_depth = 1;
    let report = run(config).await.expect("crawl failed");

    assert_eq!(
        kind_of(&report, &format!("{}/a/", server.uri())),
        Some(ProcessorKind::Html)
    );
    // Leaving /a/ spends the last level
    assert!(report.get(&format!("{}/b/", server.uri())).is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(html("<html><body>Late</body></html>").set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/slow/", server.uri()));
    config.crawler.timeout = 1;
    config.crawler.retries = 1;
    let report = run(config).await.expect("crawl failed");

    let slow = report.get(&format!("{}/slow/", server.uri())).unwrap();
    assert_eq!(slow.kind(), ProcessorKind::Error);
    assert_eq!(slow.status_code, None);
    assert!(slow.line().starts_with("[ERR]"));
    assert_eq!(report.statistics.errors, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_limit_then_resume() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let report_path = dir.path().join("resume.json");

    let mut config = create_test_config(&format!("{}/", base));
    config.crawler.limit = 2;
    config.output.to_file = Some(report_path.clone());
    let first = run(config.clone()).await.expect("first crawl failed");

    assert!(first.limit_reached);
    assert_eq!(first.snapshot.as_deref(), Some(report_path.as_path()));
    // The seed and its index probes finish together
    assert_eq!(first.processed_count, 4);

    let snapshot = load_snapshot(&report_path).expect("snapshot unreadable");
    assert_eq!(snapshot.current_processed_count, 4);
    assert!(snapshot.processing.contains(&format!("{}/admin/", base)));
    assert!(snapshot.processing.contains(&format!("{}/files/", base)));

    config.crawler.limit = 0;
    let second = run(config).await.expect("resumed crawl failed");
    assert!(!second.limit_reached);
    assert_eq!(
        kind_of(&second, &format!("{}/files/sub/", base)),
        Some(ProcessorKind::Html)
    );
    assert_eq!(kind_of(&second, &format!("{}/", base)), Some(ProcessorKind::Html));
    assert!(load_snapshot(&report_path).unwrap().processing.is_empty());

    // Nothing processed in the first run was fetched again
    server.verify().await;
}

#[tokio::test]
async fn test_resume_version_mismatch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let report_path = dir.path().join("old.json");
    std::fs::write(
        &report_path,
        r#"{"version": "0.0.1", "current_processed_count": 0, "domains": [], "processing": [], "processed": []}"#,
    )
    .unwrap();

    let mut config = create_test_config(&format!("{}/", server.uri()));
    config.output.to_file = Some(report_path.clone());

    match run(config).await {
        Err(DirhuntError::Resume(ResumeError::IncompatibleVersion { found, .. })) => {
            assert_eq!(found, "0.0.1");
        }
        other => panic!("expected IncompatibleVersion, got {:?}", other.map(|r| r.processed_count)),
    }

    // No request was made and the file is left alone
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert!(Path::new(&report_path).is_file());
}

#[tokio::test]
async fn test_closing_leaves_waiting_urls_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/a/">A</a> <a href="/b/">B</a> <a href="/c/">C</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    for page in ["/a/", "/b/", "/c/"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", "/")
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
    }
    let dir = TempDir::new().unwrap();
    let report_path = dir.path().join("closing.json");

    // The seed and its three index probes, then one more
    let mut config = create_test_config(&format!("{}/", server.uri()));
    config.crawler.threads = 1;
    config.crawler.limit = 5;
    config.output.to_file = Some(report_path.clone());
    let report = run(config).await.expect("crawl failed");

    assert!(report.limit_reached);
    assert_eq!(report.statistics.errors, 0);
    assert!(report.results.iter().all(|result| result.kind() != ProcessorKind::Error));

    // URLs still waiting for a slot at the limit are left for a resume
    let snapshot = load_snapshot(&report_path).expect("snapshot unreadable");
    assert!(!snapshot.processing.is_empty());
    assert_eq!(snapshot.processed.len() + snapshot.processing.len(), 7);
    for pending in &snapshot.processing {
        assert!(report.get(pending).is_none());
    }
}

/// Returns fixed paths for `example.com` and records every lookup
struct FakeSource {
    name: &'static str,
    confirms: bool,
    paths: Vec<&'static str>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    fn new(name: &'static str, confirms: bool, paths: Vec<&'static str>) -> Self {
        Self {
            name,
            confirms,
            paths,
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lookups(&self) -> Arc<Mutex<Vec<String>>> {
        self.lookups.clone()
    }
}

#[async_trait]
impl Source for FakeSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn confirms_existence(&self) -> bool {
        self.confirms
    }

    async fn search_by_domain(&self, domain: &str) -> Result<Vec<String>, SourceError> {
        self.lookups.lock().unwrap().push(domain.to_string());
        if domain != "example.com" {
            return Ok(Vec::new());
        }
        Ok(self
            .paths
            .iter()
            .map(|path| format!("http://{}{}", domain, path))
            .collect())
    }
}

fn sorted(lookups: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    let mut domains = lookups.lock().unwrap().clone();
    domains.sort();
    domains
}

/// Serves named hosts through the mock server acting as an HTTP proxy
///
/// ```text
/// example.com/          links to sub.example.com and other.org
/// example.com/secret/   plain page
/// example.com/hidden/   404
/// sub.example.com/      plain page
/// ```
async fn mount_hosts(server: &MockServer, subdomain_hits: u64) {
    Mock::given(method("GET"))
        .and(header("host", "example.com"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <a href="http://sub.example.com/">Sub</a>
            <a href="http://other.org/">Other</a></body></html>"#,
        ))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(header("host", "example.com"))
        .and(path("/secret/"))
        .respond_with(html("<html><body>Secret</body></html>"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(header("host", "sub.example.com"))
        .and(path("/"))
        .respond_with(html("<html><body>Sub</body></html>"))
        .expect(subdomain_hits)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(header("host", "other.org"))
        .respond_with(html("<html><body>Other</body></html>"))
        .expect(0)
        .mount(server)
        .await;
}

fn proxied_config(server: &MockServer) -> Config {
    let mut config = create_test_config("http://example.com/");
    config.http.proxies = vec![server.uri()];
    config
}

#[tokio::test]
async fn test_sources_feed_the_crawl_once_per_domain() {
    let server = MockServer::start().await;
    mount_hosts(&server, 1).await;

    let lister = FakeSource::new("lister", false, vec!["/secret/"]);
    let confirmer = FakeSource::new("confirmer", true, vec!["/hidden/"]);
    let (listed, confirmed) = (lister.lookups(), confirmer.lookups());
    let sources: Vec<Arc<dyn Source>> = vec![Arc::new(lister), Arc::new(confirmer)];
    let sources = Sources::with_sources(sources, None);

    let config = proxied_config(&server);
    let max_depth = config.crawler.max_depth;
    let report = run_with_sources(config, sources).await.expect("crawl failed");

    // Once for the seed domain and once for the subdomain found on the page
    assert_eq!(sorted(&listed), vec!["example.com", "sub.example.com"]);
    assert_eq!(sorted(&confirmed), vec!["example.com", "sub.example.com"]);
    assert!(report.domains.contains("sub.example.com"));
    assert!(!report.domains.contains("other.org"));

    let secret = report.get("http://example.com/secret/").expect("source URL not crawled");
    assert_eq!(secret.kind(), ProcessorKind::Html);
    assert_eq!(secret.crawler_url.depth, max_depth);
    assert_eq!(secret.crawler_url.origin, Origin::Source("lister"));

    // A confirmed URL keeps existing even when the server says otherwise
    let hidden = report.get("http://example.com/hidden/").expect("source URL not crawled");
    assert_eq!(hidden.kind(), ProcessorKind::NotFound);
    assert_eq!(hidden.crawler_url.exists, Some(true));
    assert!(hidden.crawler_url.flags.contains("not_found.fake"));

    assert_eq!(
        kind_of(&report, "http://sub.example.com/"),
        Some(ProcessorKind::Html)
    );
    assert!(report.get("http://other.org/").is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_subdomains_are_dropped_when_not_followed() {
    let server = MockServer::start().await;
    mount_hosts(&server, 0).await;

    let lister = FakeSource::new("lister", false, vec!["/secret/"]);
    let listed = lister.lookups();
    let sources = Sources::with_sources(vec![Arc::new(lister) as Arc<dyn Source>], None);

    let mut config = proxied_config(&server);
    config.crawler.follow_subdomains = false;
    let report = run_with_sources(config, sources).await.expect("crawl failed");

    assert_eq!(sorted(&listed), vec!["example.com"]);
    assert_eq!(report.domains.len(), 1);
    assert!(report.get("http://sub.example.com/").is_none());
    assert_eq!(
        kind_of(&report, "http://example.com/secret/"),
        Some(ProcessorKind::Html)
    );
    server.verify().await;
}
