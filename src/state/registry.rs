//! Shared crawl bookkeeping
//!
//! The registry owns the set of admitted domains, the `processing` map of
//! submitted URLs and the `processed` map of finished ones. A URL key is in
//! exactly one of the two maps once it has been submitted.

use crate::processors::CrawlResult;
use crate::state::{CrawlerUrl, TaskState};
use crate::url::parent_domains;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::watch;

/// Completion signal of a submitted URL, carrying its final `exists`
pub type CompletionSender = watch::Sender<Option<Option<bool>>>;
pub type CompletionReceiver = watch::Receiver<Option<Option<bool>>>;

/// Outcome of checking a domain against the registered set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainAdmission {
    /// Already registered
    Known,
    /// Subdomain of a registered domain, registered just now
    NewSubdomain(String),
    /// Not ours
    Outside,
}

/// Outcome of submitting a URL
#[derive(Debug)]
pub enum Claim {
    /// The caller now owns the URL and must complete it
    Claimed(CompletionSender),
    /// Another task is working on it
    InFlight(CompletionReceiver),
    /// Already finished, with its final `exists`
    Processed(Option<bool>),
}

#[derive(Debug)]
struct Slot {
    state: TaskState,
    done: CompletionReceiver,
}

/// Domains, in-flight URLs and results of one crawl
#[derive(Debug)]
pub struct Registry {
    follow_subdomains: bool,
    domains: BTreeSet<String>,
    processing: HashMap<String, Slot>,
    processed: HashMap<String, CrawlResult>,
    processed_count: usize,
}

impl Registry {
    pub fn new(follow_subdomains: bool) -> Self {
        Self {
            follow_subdomains,
            domains: BTreeSet::new(),
            processing: HashMap::new(),
            processed: HashMap::new(),
            processed_count: 0,
        }
    }

    /// Registers a domain, returning true on first contact
    pub fn register_domain(&mut self, domain: &str) -> bool {
        self.domains.insert(domain.to_lowercase())
    }

    /// Checks whether a discovered domain belongs to the crawl
    ///
    /// With subdomain following enabled, a subdomain of any registered
    /// domain is registered on the spot and reported as new so that the
    /// caller can start its passive sources.
    pub fn admit_domain(&mut self, domain: &str) -> DomainAdmission {
        let domain = domain.to_lowercase();
        if self.domains.contains(&domain) {
            return DomainAdmission::Known;
        }
        if !self.follow_subdomains {
            return DomainAdmission::Outside;
        }
        let is_subdomain = parent_domains(&domain)
            .skip(1)
            .any(|parent| self.domains.contains(parent));
        if is_subdomain {
            self.domains.insert(domain.clone());
            DomainAdmission::NewSubdomain(domain)
        } else {
            DomainAdmission::Outside
        }
    }

    /// Submits a URL, resolving repeated submissions to the existing entry
    pub fn claim(&mut self, crawler_url: &CrawlerUrl) -> Claim {
        let key = crawler_url.key();
        if let Some(result) = self.processed.get(key) {
            return Claim::Processed(result.crawler_url.exists);
        }
        if let Some(slot) = self.processing.get(key) {
            return Claim::InFlight(slot.done.clone());
        }
        let (sender, receiver) = watch::channel(None);
        self.processing.insert(
            key.to_string(),
            Slot {
                state: TaskState::Queued,
                done: receiver,
            },
        );
        Claim::Claimed(sender)
    }

    /// Records that the URL holds its domain slot
    pub fn mark_in_flight(&mut self, key: &str) {
        if let Some(slot) = self.processing.get_mut(key) {
            if slot.state.can_transition_to(TaskState::InFlight) {
                slot.state = TaskState::InFlight;
            }
        }
    }

    /// Moves a URL from `processing` to `processed`
    ///
    /// # Returns
    ///
    /// The number of URLs processed so far
    pub fn complete(&mut self, result: CrawlResult) -> usize {
        let key = result.crawler_url.key().to_string();
        self.processing.remove(&key);
        if self.processed.insert(key, result).is_none() {
            self.processed_count += 1;
        }
        self.processed_count
    }

    /// Drops a submitted URL that will never run
    pub fn abandon(&mut self, key: &str) {
        self.processing.remove(key);
    }

    /// Current lifecycle state of a URL, if it was ever submitted
    pub fn state_of(&self, key: &str) -> Option<TaskState> {
        if let Some(result) = self.processed.get(key) {
            return Some(if result.is_error() {
                TaskState::Error
            } else {
                TaskState::Processed
            });
        }
        self.processing.get(key).map(|slot| slot.state)
    }

    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    pub fn processing_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.processing.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn processed(&self) -> impl Iterator<Item = &CrawlResult> {
        self.processed.values()
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    pub fn get(&self, key: &str) -> Option<&CrawlResult> {
        self.processed.get(key)
    }

    /// Loads a result from a previous run without counting it as a new one
    pub fn restore(&mut self, result: CrawlResult) {
        let key = result.crawler_url.key().to_string();
        self.processing.remove(&key);
        self.processed.insert(key, result);
    }

    /// Overrides the processed counter when resuming
    pub fn set_processed_count(&mut self, count: usize) {
        self.processed_count = count;
    }
}
