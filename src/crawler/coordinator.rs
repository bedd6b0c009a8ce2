//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns every state transition. Spawned tasks fetch and
//! process one URL each and hand their discoveries back through the
//! `JoinSet`; only the main loop admits new URLs. This covers:
//! - Domain admission and the passive source fan-out
//! - Depth exhaustion and duplicate suppression
//! - The processed-count limit and interrupts
//! - Resume snapshots and the final report
//! - The interesting file pass once the crawl settles

use crate::config::Config;
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::interrupt::{self, InterruptChoice};
use crate::crawler::scheduler::Scheduler;
use crate::output::{self, CrawlStatistics, FileInfoReport, FlagFilter, Snapshot};
use crate::processors::{self, CrawlResult, Page, ProcessSettings, Processor};
use crate::sources::{source_client, SourceCache, SourceOutcome, Sources};
use crate::state::{Claim, CompletionSender, CrawlerUrl, DomainAdmission, Origin, Registry, UrlType};
use crate::url::Url;
use crate::DirhuntError;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};

/// Processed URLs between two progress messages
const PROGRESS_INTERVAL: usize = 10;

/// What a spawned task hands back to the main loop
#[derive(Debug)]
pub enum TaskOutput {
    /// The URL's own result first, then those of nested index probes
    Url {
        results: Vec<CrawlResult>,
        discoveries: Vec<CrawlerUrl>,
    },
    Source(SourceOutcome),
}

/// State reachable from every task
struct Shared {
    settings: ProcessSettings,
    fetcher: Fetcher,
    scheduler: Scheduler,
    registry: Mutex<Registry>,
    closing: AtomicBool,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// Outcome of a finished crawl
#[derive(Debug)]
pub struct CrawlReport {
    /// Every processed result, sorted by address
    pub results: Vec<CrawlResult>,
    pub domains: BTreeSet<String>,
    pub processed_count: usize,
    pub limit_reached: bool,
    pub aborted: bool,
    /// Where the snapshot was written, if anywhere
    pub snapshot: Option<PathBuf>,
    pub statistics: CrawlStatistics,
    /// Interesting listing entries, fetched after the crawl
    pub interesting_files: FileInfoReport,
}

impl CrawlReport {
    pub fn get(&self, address: &str) -> Option<&CrawlResult> {
        self.results
            .iter()
            .find(|result| result.crawler_url.key() == address)
    }
}

/// Main crawler coordinator structure
pub struct Crawler {
    config: Config,
    shared: Arc<Shared>,
    sources: Sources,
    filter: FlagFilter,
    tasks: JoinSet<TaskOutput>,
    interrupts: bool,
    limit_reached: bool,
    aborted: bool,
    last_progress: usize,
}

impl Crawler {
    /// Creates a crawler with every source not excluded by the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(DirhuntError)` - The HTTP clients could not be built
    pub fn new(config: Config) -> Result<Self, DirhuntError> {
        let user_agent = config
            .http
            .user_agent
            .clone()
            .unwrap_or_else(crate::crawler::default_user_agent);
        let cache = config
            .sources
            .cache_dir
            .clone()
            .or_else(SourceCache::default_dir)
            .map(SourceCache::new);
        let sources = Sources::new(source_client(&user_agent)?, &config.sources.exclude, cache);
        Self::with_sources(config, sources)
    }

    /// Creates a crawler with an explicit set of sources
    pub fn with_sources(config: Config, sources: Sources) -> Result<Self, DirhuntError> {
        let shared = Shared {
            settings: ProcessSettings::from(&config),
            fetcher: Fetcher::new(&config)?,
            scheduler: scheduler(&config),
            registry: Mutex::new(Registry::new(config.crawler.follow_subdomains)),
            closing: AtomicBool::new(false),
        };
        Ok(Self {
            filter: FlagFilter::from_config(&config.filters),
            config,
            shared: Arc::new(shared),
            sources,
            tasks: JoinSet::new(),
            interrupts: false,
            limit_reached: false,
            aborted: false,
            last_progress: 0,
        })
    }

    /// Overrides the pause between fetch attempts
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.fetcher.set_retry_delay(retry_delay);
        }
        self
    }

    /// Prompts on Ctrl-C instead of leaving the signal to the runtime
    pub fn with_interrupts(mut self) -> Self {
        self.interrupts = true;
        self
    }

    /// Runs the crawl to completion
    ///
    /// Resumes from the configured report file when it exists, then seeds
    /// every configured URL and processes discoveries until no task is left.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl finished, hit its limit or was aborted
    /// * `Err(DirhuntError)` - The resume file could not be used or the report could not be written
    pub async fn run(mut self) -> Result<CrawlReport, DirhuntError> {
        let started = Instant::now();

        let pending = match self.config.output.to_file.clone() {
            Some(path) if path.is_file() => {
                let snapshot = output::load_snapshot(&path)?;
                tracing::info!(
                    "Resuming from {} ({} URLs already processed)",
                    path.display(),
                    snapshot.current_processed_count
                );
                snapshot.restore_into(&mut self.shared.registry())
            }
            _ => Vec::new(),
        };

        for seed in self.config.urls.clone() {
            self.add_seed(&seed);
        }
        let max_depth = self.config.crawler.max_depth;
        for address in pending {
            self.submit(CrawlerUrl::new(Url::new(&address), max_depth));
        }

        tracing::info!(
            "Crawling {} seed(s) with {} source(s)",
            self.config.urls.len(),
            self.sources.names().len()
        );
        self.event_loop().await;

        let interesting_files = if self.aborted {
            FileInfoReport::default()
        } else {
            self.file_info().await
        };
        self.finish(started.elapsed(), interesting_files)
    }

    async fn event_loop(&mut self) {
        loop {
            let interrupts = self.interrupts;
            let event = tokio::select! {
                joined = self.tasks.join_next() => joined.map(Event::Joined),
                signal = tokio::signal::ctrl_c(), if interrupts => Some(Event::Interrupt(signal.is_ok())),
            };
            let Some(event) = event else {
                break;
            };
            match event {
                Event::Joined(Ok(output)) => self.handle_output(output),
                Event::Joined(Err(error)) => self.handle_join_error(error),
                Event::Interrupt(true) => self.handle_interrupt().await,
                Event::Interrupt(false) => {
                    tracing::warn!("Unable to listen for Ctrl-C, interrupts disabled");
                    self.interrupts = false;
                }
            }
        }
    }

    fn handle_output(&mut self, output: TaskOutput) {
        match output {
            TaskOutput::Url {
                results,
                discoveries,
            } => {
                for result in &results {
                    self.record(result);
                }
                for crawler_url in discoveries {
                    self.submit(crawler_url);
                }
            }
            TaskOutput::Source(outcome) => self.handle_source(outcome),
        }
    }

    fn handle_join_error(&self, error: JoinError) {
        if !error.is_cancelled() {
            tracing::warn!("Crawl task failed: {}", error);
        }
    }

    /// Live output, progress and the processed-count limit
    fn record(&mut self, result: &CrawlResult) {
        if self.config.output.progress {
            output::print_live(result, &self.filter);
        }

        let processed = self.shared.registry().processed_count();
        if processed >= self.last_progress + PROGRESS_INTERVAL {
            self.last_progress = processed - processed % PROGRESS_INTERVAL;
            tracing::info!(
                "{} URLs processed, {} tasks running",
                processed,
                self.tasks.len()
            );
        }

        let limit = self.config.crawler.limit;
        if limit > 0 && processed >= limit && !self.shared.is_closing() {
            tracing::info!("Limit of {} processed URLs reached, finishing in-flight work", limit);
            self.limit_reached = true;
            self.close();
        }
    }

    fn handle_source(&mut self, outcome: SourceOutcome) {
        let exists = outcome.confirmed.then_some(true);
        let max_depth = self.config.crawler.max_depth;
        for address in &outcome.urls {
            let url = Url::new(address);
            if !url.is_valid() {
                continue;
            }
            let crawler_url = CrawlerUrl::new(url, max_depth)
                .with_exists(exists)
                .with_origin(Origin::Source(outcome.name));
            self.submit(crawler_url);
        }
    }

    async fn handle_interrupt(&mut self) {
        match interrupt::prompt().await {
            InterruptChoice::Abort => {
                tracing::info!("Aborting crawl");
                self.aborted = true;
                self.close();
                self.tasks.abort_all();
            }
            InterruptChoice::Continue => tracing::info!("Continuing crawl"),
            InterruptChoice::Results => {
                let registry = self.shared.registry();
                let ranked = output::rank(registry.processed(), &self.filter);
                output::print_ranked(&ranked);
            }
        }
    }

    /// Stops admitting work; fetches still waiting for a slot are dropped
    /// and stay pending
    fn close(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);
        self.shared.scheduler.close();
    }

    async fn file_info(&self) -> FileInfoReport {
        let entries =
            output::interesting_entries(self.shared.registry().processed(), &self.shared.settings);
        if entries.is_empty() {
            return FileInfoReport::default();
        }
        tracing::info!("Fetching {} interesting file(s)", entries.len());
        // The crawl's own scheduler is closed once the limit is hit
        output::collect_file_info(
            &self.shared.fetcher,
            &scheduler(&self.config),
            entries,
            self.config.crawler.threads,
        )
        .await
    }

    /// Registers a seed's domain, starts its sources and submits it
    fn add_seed(&mut self, address: &str) {
        let url = Url::new(address);
        let Some(domain) = url.domain().map(str::to_string) else {
            tracing::warn!("Ignoring invalid seed {}", address);
            return;
        };
        let is_new = self.shared.registry().register_domain(&domain);
        if is_new {
            self.start_sources(&domain);
        }
        let crawler_url = CrawlerUrl::new(url, self.config.crawler.max_depth);
        self.submit(crawler_url);
    }

    fn start_sources(&mut self, domain: &str) {
        if self.shared.is_closing() {
            return;
        }
        for lookup in self.sources.lookups(domain) {
            self.tasks.spawn(async move { TaskOutput::Source(lookup.await) });
        }
    }

    /// The only way into the crawl for a URL
    ///
    /// Once the crawl is closing, admitted URLs are claimed but not run so
    /// that they land in the snapshot as pending work.
    fn submit(&mut self, crawler_url: CrawlerUrl) {
        if crawler_url.depth <= 0 && crawler_url.url_type != UrlType::Asset {
            return;
        }
        let Some(domain) = crawler_url.url.domain().map(str::to_string) else {
            return;
        };

        let admission = self.shared.registry().admit_domain(&domain);
        match admission {
            DomainAdmission::Outside => return,
            DomainAdmission::NewSubdomain(subdomain) => {
                tracing::info!("Following new subdomain {}", subdomain);
                self.start_sources(&subdomain);
            }
            DomainAdmission::Known => {}
        }

        let claim = self.shared.registry().claim(&crawler_url);
        if self.shared.is_closing() {
            return;
        }
        if let Claim::Claimed(sender) = claim {
            tracing::debug!("Queued {} ({})", crawler_url.url, crawler_url.origin);
            self.tasks
                .spawn(process_url(self.shared.clone(), crawler_url, sender));
        }
    }

    fn finish(
        self,
        elapsed: Duration,
        interesting_files: FileInfoReport,
    ) -> Result<CrawlReport, DirhuntError> {
        let registry = self.shared.registry();

        let snapshot_path = match &self.config.output.to_file {
            Some(path) => Some(path.clone()),
            None if self.limit_reached || self.aborted => registry
                .domains()
                .iter()
                .next()
                .map(|domain| output::default_report_path(domain)),
            None => None,
        };
        if let Some(path) = &snapshot_path {
            output::write_snapshot(path, &Snapshot::from_registry(&registry))?;
            if self.limit_reached || self.aborted {
                tracing::info!(
                    "Crawl state saved. Use --to-file {} to continue",
                    path.display()
                );
            } else {
                tracing::info!("Report written to {}", path.display());
            }
        }

        let mut results: Vec<CrawlResult> = registry.processed().cloned().collect();
        results.sort_by(|a, b| a.crawler_url.key().cmp(b.crawler_url.key()));
        let statistics = CrawlStatistics::from_results(&results, registry.domains(), elapsed);

        Ok(CrawlReport {
            domains: registry.domains().clone(),
            processed_count: registry.processed_count(),
            results,
            limit_reached: self.limit_reached,
            aborted: self.aborted,
            snapshot: snapshot_path,
            statistics,
            interesting_files,
        })
    }
}

fn scheduler(config: &Config) -> Scheduler {
    Scheduler::new(
        config.crawler.threads,
        config.crawler.concurrency,
        Duration::from_secs_f64(config.crawler.delay.max(0.0)),
    )
}

enum Event {
    Joined(Result<TaskOutput, JoinError>),
    /// `false` when the signal handler could not be installed
    Interrupt(bool),
}

/// Fetches with retries, holding a slot only while the exchange runs
async fn fetch_page(shared: &Shared, crawler_url: &CrawlerUrl) -> Result<Page, FetchError> {
    let domain = crawler_url.url.domain().unwrap_or_default();
    let mut attempt = 0;
    loop {
        let slot = shared
            .scheduler
            .acquire(domain)
            .await
            .map_err(|_| FetchError::Closed)?;
        shared.registry().mark_in_flight(crawler_url.key());
        let outcome = shared.fetcher.fetch(crawler_url).await;
        slot.release().await;

        match outcome {
            Err(error) if error.is_retryable() && attempt < shared.fetcher.retries() => {
                attempt += 1;
                tracing::debug!(
                    "Retrying {} ({}/{}): {}",
                    crawler_url.url,
                    attempt,
                    shared.fetcher.retries(),
                    error
                );
                tokio::time::sleep(shared.fetcher.retry_delay()).await;
            }
            Err(error) => {
                if error.is_retryable() {
                    tracing::warn!(
                        "Giving up on {} after {} attempts: {}",
                        crawler_url.url,
                        attempt + 1,
                        error
                    );
                }
                return Err(error);
            }
            Ok(page) => {
                tracing::debug!("Fetched {} [{}]", crawler_url.url, page.status);
                return Ok(page);
            }
        }
    }
}

/// Resolves an index file candidate, running it here if nobody else is
///
/// # Returns
///
/// The candidate's `exists` once it is settled
async fn probe_index(
    shared: &Arc<Shared>,
    probe: CrawlerUrl,
    results: &mut Vec<CrawlResult>,
    discoveries: &mut Vec<CrawlerUrl>,
) -> Option<bool> {
    let claim = shared.registry().claim(&probe);
    match claim {
        Claim::Processed(exists) => exists,
        Claim::InFlight(mut receiver) => {
            // A dropped sender means the other task was cancelled
            let settled = match receiver.wait_for(Option::is_some).await {
                Ok(value) => *value,
                Err(_) => None,
            };
            settled.flatten()
        }
        Claim::Claimed(sender) => {
            let key = probe.key().to_string();
            let output = process_url(shared.clone(), probe, sender).await;
            let TaskOutput::Url {
                results: probed,
                discoveries: found,
            } = output
            else {
                return None;
            };
            if probed.is_empty() {
                // Closed before it could run; not worth resuming on its own
                shared.registry().abandon(&key);
                return None;
            }
            let exists = probed.first().and_then(|result| result.crawler_url.exists);
            results.extend(probed);
            discoveries.extend(found);
            exists
        }
    }
}

/// Fetches and processes one claimed URL
///
/// Index probes run inline and are awaited, so a directory is only completed
/// once its index file candidates are settled. A URL that never gets a slot
/// because the crawl closed is left in `processing` and produces no result.
fn process_url(
    shared: Arc<Shared>,
    mut crawler_url: CrawlerUrl,
    sender: CompletionSender,
) -> BoxFuture<'static, TaskOutput> {
    Box::pin(async move {
        let mut results = Vec::new();
        let mut discoveries = Vec::new();

        let result = match fetch_page(&shared, &crawler_url).await {
            Err(FetchError::Closed) => {
                tracing::debug!("Leaving {} pending", crawler_url.url);
                return TaskOutput::Url {
                    results,
                    discoveries,
                };
            }
            Err(error) => CrawlResult::new(
                Processor::Error {
                    message: error.to_string(),
                },
                None,
                crawler_url,
            ),
            Ok(page) => {
                crawler_url.set_type(page.content_type.as_deref());
                crawler_url.flags.insert(page.status.to_string());

                let processing = processors::process(&mut crawler_url, &page, &shared.settings);
                discoveries.extend(processing.discoveries);

                let mut index_file = None;
                if processing.processor.kind().probes_index() {
                    for probe in crawler_url.index_probes() {
                        if shared.is_closing() {
                            break;
                        }
                        let url = probe.url.clone();
                        let exists =
                            probe_index(&shared, probe, &mut results, &mut discoveries).await;
                        if exists == Some(true) {
                            index_file = Some(url);
                            break;
                        }
                    }
                }

                let flags = processing.processor.flags(&crawler_url, &shared.settings);
                crawler_url.flags.extend(flags);
                if crawler_url.exists.is_none() && page.status < 404 {
                    crawler_url.exists = Some(true);
                }
                discoveries.extend(crawler_url.self_directories());

                let mut result = CrawlResult::new(processing.processor, Some(page.status), crawler_url);
                result.index_file = index_file;
                result.keywords_found = processing.keywords_found;
                result
            }
        };

        let exists = result.crawler_url.exists;
        shared.registry().complete(result.clone());
        sender.send_replace(Some(exists));

        results.insert(0, result);
        TaskOutput::Url {
            results,
            discoveries,
        }
    })
}
