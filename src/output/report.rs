//! Resume and report snapshots
//!
//! A snapshot is a JSON document holding every processed result, the URLs
//! still in progress and the admitted domains. It doubles as the final
//! report and as the starting point of a resumed crawl.

use crate::processors::{CrawlResult, ListingEntry, Processor, ProcessorKind};
use crate::state::{CrawlerUrl, Registry};
use crate::url::Url;
use crate::{ResumeError, ResumeResult, VERSION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// One processed URL as stored in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub processor_class: String,
    pub status_code: Option<u16>,
    pub crawler_url: CrawlerUrl,
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_file: Option<Url>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub keywords_found: BTreeSet<String>,
    /// Entries of a directory listing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ListingEntry>,
}

impl ReportEntry {
    pub fn from_result(result: &CrawlResult) -> Self {
        Self {
            processor_class: result.kind().class_name().to_string(),
            status_code: result.status_code,
            crawler_url: result.crawler_url.clone(),
            line: result.line(),
            index_file: result.index_file.clone(),
            keywords_found: result.keywords_found.clone(),
            files: match &result.processor {
                Processor::IndexOf { files } => files.clone(),
                _ => Vec::new(),
            },
        }
    }

    /// Rebuilds the result
    ///
    /// Only error messages and listing entries survive; other processors are
    /// restored without their payload.
    pub fn into_result(self) -> CrawlResult {
        let kind = ProcessorKind::from_class_name(&self.processor_class)
            .unwrap_or(ProcessorKind::Generic);
        let processor = match kind {
            ProcessorKind::Error => Processor::Error {
                message: self
                    .line
                    .split_once("): ")
                    .map(|(_, message)| message.to_string())
                    .unwrap_or_default(),
            },
            ProcessorKind::IndexOf => Processor::IndexOf { files: self.files },
            kind => Processor::restored(kind),
        };
        let mut result = CrawlResult::new(processor, self.status_code, self.crawler_url);
        result.index_file = self.index_file;
        result.keywords_found = self.keywords_found;
        result
    }
}

/// Serialized crawl state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub current_processed_count: usize,
    pub domains: Vec<String>,
    pub processing: Vec<String>,
    pub processed: Vec<ReportEntry>,
}

impl Snapshot {
    /// Captures the registry, results sorted by address
    pub fn from_registry(registry: &Registry) -> Self {
        let mut processed: Vec<ReportEntry> =
            registry.processed().map(ReportEntry::from_result).collect();
        processed.sort_by(|a, b| a.crawler_url.key().cmp(b.crawler_url.key()));
        Self {
            version: VERSION.to_string(),
            current_processed_count: registry.processed_count(),
            domains: registry.domains().iter().cloned().collect(),
            processing: registry.processing_keys(),
            processed,
        }
    }

    /// Loads the snapshot into a registry
    ///
    /// # Returns
    ///
    /// The URLs that were still in progress and have to be submitted again
    pub fn restore_into(self, registry: &mut Registry) -> Vec<String> {
        for domain in &self.domains {
            registry.register_domain(domain);
        }
        for entry in self.processed {
            registry.restore(entry.into_result());
        }
        registry.set_processed_count(self.current_processed_count);
        self.processing
    }
}

/// `<domain>.dirhunt.json` in the working directory
pub fn default_report_path(domain: &str) -> PathBuf {
    PathBuf::from(format!("{}.dirhunt.json", domain))
}

/// Writes a snapshot as pretty JSON
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> crate::Result<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Reads a snapshot, refusing files written by another version
///
/// The version is checked before the rest of the document so that format
/// changes between versions surface as an incompatibility.
pub fn load_snapshot(path: &Path) -> ResumeResult<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let found = value
        .get("version")
        .and_then(|version| version.as_str())
        .unwrap_or("unknown");
    if found != VERSION {
        return Err(ResumeError::IncompatibleVersion {
            found: found.to_string(),
            expected: VERSION.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::ListingMetadata;
    use crate::state::UrlType;
    use tempfile::TempDir;

    fn registry() -> Registry {
        let mut registry = Registry::new(true);
        registry.register_domain("example.com");

        let mut crawler_url = CrawlerUrl::new(Url::new("http://example.com/admin/"), 2)
            .with_type(UrlType::Directory)
            .with_exists(Some(true));
        crawler_url.flags.insert("200".to_string());
        crawler_url.flags.insert("blank".to_string());
        registry.claim(&crawler_url);
        registry.complete(CrawlResult::new(Processor::BlankPage, Some(200), crawler_url));

        let failed = CrawlerUrl::new(Url::new("http://example.com/slow"), 2);
        registry.claim(&failed);
        registry.complete(CrawlResult::new(
            Processor::Error {
                message: "Request timed out after 10s".to_string(),
            },
            None,
            failed,
        ));

        registry.claim(&CrawlerUrl::new(Url::new("http://example.com/pending/"), 1));
        registry
    }

    #[test]
    fn test_listing_entries_survive_resume() {
        let mut registry = registry();
        let listing = CrawlerUrl::new(Url::new("http://example.com/files/"), 2);
        registry.claim(&listing);
        registry.complete(CrawlResult::new(
            Processor::IndexOf {
                files: vec![ListingEntry {
                    url: Url::new("http://example.com/files/backup.zip"),
                    extra: ListingMetadata {
                        created_at: Some("2024-01-02 10:00".to_string()),
                        filesize: Some("2M".to_string()),
                    },
                }],
            },
            Some(200),
            listing,
        ));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("files.json");
        write_snapshot(&path, &Snapshot::from_registry(&registry)).unwrap();
        let mut restored = Registry::new(true);
        load_snapshot(&path).unwrap().restore_into(&mut restored);

        let files = match &restored.get("http://example.com/files/").unwrap().processor {
            Processor::IndexOf { files } => files.clone(),
            other => panic!("expected IndexOf, got {:?}", other),
        };
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].url.as_str(), "http://example.com/files/backup.zip");
        assert_eq!(files[0].extra.filesize.as_deref(), Some("2M"));
        // Results without a listing carry no files key
        let value = serde_json::to_value(Snapshot::from_registry(&restored)).unwrap();
        assert!(value["processed"][0].get("files").is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.com.dirhunt.json");
        let snapshot = Snapshot::from_registry(&registry());
        write_snapshot(&path, &snapshot).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.current_processed_count, 2);
        assert_eq!(loaded.domains, vec!["example.com"]);
        assert_eq!(loaded.processing, vec!["http://example.com/pending/"]);

        let mut restored = Registry::new(true);
        let pending = loaded.restore_into(&mut restored);
        assert_eq!(pending, vec!["http://example.com/pending/"]);
        assert_eq!(restored.processed_count(), 2);

        let admin = restored.get("http://example.com/admin/").unwrap();
        assert_eq!(admin.kind(), ProcessorKind::BlankPage);
        assert_eq!(
            admin.crawler_url.flags,
            BTreeSet::from(["200".to_string(), "blank".to_string()])
        );
        assert_eq!(admin.crawler_url.url_type, UrlType::Directory);
        assert_eq!(admin.crawler_url.exists, Some(true));

        let slow = restored.get("http://example.com/slow").unwrap();
        assert_eq!(
            slow.processor,
            Processor::Error {
                message: "Request timed out after 10s".to_string()
            }
        );
    }

    #[test]
    fn test_snapshot_layout() {
        let snapshot = Snapshot::from_registry(&registry());
        let value = serde_json::to_value(&snapshot).unwrap();
        let entry = &value["processed"][0];
        assert_eq!(entry["processor_class"], "BlankPage");
        assert_eq!(entry["status_code"], 200);
        assert_eq!(entry["crawler_url"]["type"], "directory");
        assert_eq!(
            entry["crawler_url"]["url"]["address"],
            "http://example.com/admin/"
        );
        assert_eq!(entry["crawler_url"]["url"]["domain"], "example.com");
        assert_eq!(value["version"], VERSION);
    }

    #[test]
    fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(
            &path,
            r#"{"version": "0.0.1", "current_processed_count": 0, "domains": [], "processing": [], "processed": []}"#,
        )
        .unwrap();

        match load_snapshot(&path) {
            Err(ResumeError::IncompatibleVersion { found, expected }) => {
                assert_eq!(found, "0.0.1");
                assert_eq!(expected, VERSION);
            }
            other => panic!("expected IncompatibleVersion, got {:?}", other),
        }
        // The file is left untouched
        assert!(path.is_file());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_snapshot(&path), Err(ResumeError::Corrupt(_))));
    }

    #[test]
    fn test_default_report_path() {
        assert_eq!(
            default_report_path("example.com"),
            PathBuf::from("example.com.dirhunt.json")
        );
    }
}
