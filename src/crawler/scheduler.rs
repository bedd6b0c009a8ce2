//! Fetch slot accounting
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore sized by `threads`
//! - Per-domain fairness via one semaphore per domain sized by `concurrency`
//! - The inter-request delay, spent while still holding the domain slot
//!   but after the global slot has been handed back
//! - Closing, which fails every pending and future acquire

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Permission to run one exchange
///
/// Dropping the slot frees it immediately; `release` honors the delay first.
pub struct FetchSlot {
    _domain: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
    delay: Duration,
}

impl FetchSlot {
    /// Frees the global permit, sleeps for the configured delay, then frees
    /// the domain permit
    pub async fn release(self) {
        let FetchSlot {
            _domain: domain,
            _global: global,
            delay,
        } = self;
        drop(global);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        drop(domain);
    }
}

/// Global and per-domain semaphores of one crawl
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global: Arc<Semaphore>,

    /// One semaphore per target domain, created on first use
    domains: Mutex<HashMap<String, Arc<Semaphore>>>,

    concurrency: usize,
    delay: Duration,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `threads` - Simultaneous exchanges across all domains
    /// * `concurrency` - Simultaneous exchanges per domain
    /// * `delay` - Pause before a domain slot is handed to the next request
    pub fn new(threads: usize, concurrency: usize, delay: Duration) -> Self {
        Self {
            global: Arc::new(Semaphore::new(threads.max(1))),
            domains: Mutex::new(HashMap::new()),
            concurrency: concurrency.max(1),
            delay,
        }
    }

    fn domain_semaphore(&self, domain: &str) -> Arc<Semaphore> {
        let mut domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        domains
            .entry(domain.to_lowercase())
            .or_insert_with(|| Arc::new(Semaphore::new(self.concurrency)))
            .clone()
    }

    /// Waits for a slot on `domain`, then for a global one
    ///
    /// Taking the domain permit first keeps a saturated domain from holding
    /// global permits while it waits.
    pub async fn acquire(&self, domain: &str) -> Result<FetchSlot, AcquireError> {
        let domain = self.domain_semaphore(domain).acquire_owned().await?;
        let global = self.global.clone().acquire_owned().await?;
        Ok(FetchSlot {
            _domain: domain,
            _global: global,
            delay: self.delay,
        })
    }

    /// Makes every waiting and future `acquire` fail
    ///
    /// Slots already handed out stay valid until released.
    pub fn close(&self) {
        self.global.close();
        let domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        for semaphore in domains.values() {
            semaphore.close();
        }
    }

    #[cfg(test)]
    fn available(&self, domain: &str) -> usize {
        self.domain_semaphore(domain).available_permits()
    }

    #[cfg(test)]
    fn available_global(&self) -> usize {
        self.global.available_permits()
    }

    #[cfg(test)]
    fn domain_count(&self) -> usize {
        self.domains.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
