//! Crawler coordinator - main crawl orchestration logic
//!
//! This module runs one crawl to completion:
//! - A dispatcher task pops URLs from the frontier and spawns one worker per
//!   URL once a concurrency slot is free
//! - Workers fetch and rewrite their page, capture any raw resources it
//!   references, free their slot, and hand the result back over a channel
//! - The collector (the caller of [`Coordinator::run`]) is the single writer:
//!   it folds discovered links into the frontier, writes the resource to the
//!   store, and only then marks the unit of work done
//!
//! The run ends when no admitted URL is left unprocessed.

use crate::config::{validate_crawler, CrawlerConfig};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchedPage};
use crate::crawler::redirect::RedirectResolver;
use crate::crawler::rewriter::LinkRewriter;
use crate::crawler::scheduler::{Admission, ScheduledFetch, Scheduler};
use crate::storage::Store;
use crate::url::{normalize, storage_key, LocalHosts};
use crate::StaticatorError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use url::Url;

/// Summary of a finished crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Fetches reserved, pages and raw captures together
    pub fetches: usize,

    /// Page resources written
    pub pages: usize,

    /// Redirect records written for crawled URLs
    pub redirects: usize,

    /// Raw resources captured without crawling
    pub captures: usize,

    /// URLs whose fetch or rewrite failed
    pub failures: usize,

    /// Every URL admitted to the frontier, sorted
    pub visited: Vec<String>,

    /// URLs found after the fetch limit was reached, sorted
    pub overflow: Vec<String>,
}

impl CrawlReport {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// State shared by the dispatcher, the workers and the collector
struct CrawlContext {
    config: CrawlerConfig,
    client: Client,
    hosts: LocalHosts,
    rewriter: LinkRewriter,
    store: Arc<dyn Store>,
    scheduler: Scheduler,
}

/// What a worker hands back to the collector
struct PageResult {
    url: Url,
    result: Result<WorkerOutput, StaticatorError>,
}

struct WorkerOutput {
    page: FetchedPage,
    captures: usize,
}

/// Running totals kept by the collector
#[derive(Debug, Default)]
struct Tally {
    processed: usize,
    pages: usize,
    redirects: usize,
    captures: usize,
    failures: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl settings
    /// * `store` - Where fetched resources are written
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(StaticatorError)` - Invalid settings or HTTP client failure
    pub fn new(config: CrawlerConfig, store: Arc<dyn Store>) -> Result<Self, StaticatorError> {
        validate_crawler(&config)?;

        let hosts = LocalHosts::from_seed(&config.seed, &config.aliases)?;
        let client = build_http_client(&config)?;
        let rewriter = LinkRewriter::new(hosts.clone(), config.head_links);
        let scheduler = Scheduler::new(config.fetch_limit, config.max_parallel);

        Ok(Self {
            ctx: Arc::new(CrawlContext {
                config,
                client,
                hosts,
                rewriter,
                store,
                scheduler,
            }),
        })
    }

    /// Runs the crawl to completion
    ///
    /// Per-URL failures are logged and counted. A store failure aborts the
    /// run: in-flight workers are cancelled and the error is returned.
    pub async fn run(&self) -> Result<CrawlReport, StaticatorError> {
        let ctx = &self.ctx;
        let started_at = Utc::now();
        let start_time = Instant::now();

        let seed = normalize(&ctx.config.seed)?;
        tracing::info!(
            seed = %seed,
            limit = ctx.config.fetch_limit,
            parallel = ctx.config.max_parallel,
            head_links = %ctx.config.head_links,
            "Starting crawl"
        );
        if !ctx.hosts.aliases().is_empty() {
            tracing::info!("Also treating as local: {}", ctx.hosts.aliases().join(", "));
        }

        ctx.scheduler.admit(&seed);

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(ctx.clone(), sender));

        let mut tally = Tally::default();
        let outcome = self.collect(&mut receiver, &mut tally, start_time).await;
        ctx.scheduler.finish();

        if let Err(e) = outcome {
            // Dropping the dispatcher's JoinSet aborts every in-flight worker
            dispatcher.abort();
            tracing::error!("Crawl aborted: {}", e);
            return Err(e);
        }

        if let Err(e) = dispatcher.await {
            tracing::error!("Dispatcher task failed: {}", e);
        }

        let report = {
            let frontier = ctx.scheduler.frontier();
            CrawlReport {
                seed: seed.to_string(),
                started_at,
                finished_at: Utc::now(),
                fetches: frontier.scheduled(),
                pages: tally.pages,
                redirects: tally.redirects,
                captures: tally.captures,
                failures: tally.failures,
                visited: frontier.visited(),
                overflow: frontier.overflow(),
            }
        };

        tracing::info!(
            "Crawl completed: {} pages, {} redirects, {} captures, {} failures in {:?}",
            report.pages,
            report.redirects,
            report.captures,
            report.failures,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Processes worker results until no outstanding work is left
    async fn collect(
        &self,
        receiver: &mut UnboundedReceiver<PageResult>,
        tally: &mut Tally,
        start_time: Instant,
    ) -> Result<(), StaticatorError> {
        let ctx = &self.ctx;

        loop {
            let outstanding = ctx.scheduler.frontier().outstanding();
            if outstanding == 0 {
                break;
            }

            let Some(PageResult { url, result }) = receiver.recv().await else {
                tracing::error!("Workers stopped before the crawl finished");
                break;
            };

            match result {
                Ok(output) => self.record(&url, output, tally)?,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(url = %url, "Failed: {}", e);
                    tally.failures += 1;
                }
            }

            ctx.scheduler.complete();
            tally.processed += 1;

            // Progress reporting every 10 results
            if tally.processed % 10 == 0 {
                let rate = tally.processed as f64 / start_time.elapsed().as_secs_f64();
                let frontier = ctx.scheduler.frontier();
                tracing::info!(
                    "Progress: {} processed, {} queued, {} outstanding, {:.2} pages/sec",
                    tally.processed,
                    frontier.queued(),
                    frontier.outstanding(),
                    rate
                );
            }
        }

        Ok(())
    }

    /// Folds one successful result into the frontier and the store
    fn record(
        &self,
        url: &Url,
        output: WorkerOutput,
        tally: &mut Tally,
    ) -> Result<(), StaticatorError> {
        let WorkerOutput { page, captures } = output;
        tally.captures += captures;

        for link in &page.discovered.pages {
            self.enqueue(url, link);
        }

        self.ctx.store.write(&storage_key(url)?, &page.resource)?;

        if page.resource.is_redirect() {
            tally.redirects += 1;
        } else {
            tally.pages += 1;
        }

        Ok(())
    }

    /// Offers a discovered link to the frontier
    fn enqueue(&self, from: &Url, link: &Url) {
        let url = match normalize(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Failed to normalize URL {}: {}", link, e);
                return;
            }
        };

        if !self.ctx.hosts.is_local(&url) {
            tracing::debug!(from = %from, "Not following off-site link {}", url);
            return;
        }

        match self.ctx.scheduler.admit(&url) {
            Admission::Scheduled => tracing::debug!(from = %from, "Queued {}", url),
            Admission::Seen => tracing::trace!(from = %from, "Already seen {}", url),
            Admission::Overflow => {
                tracing::debug!(from = %from, "Fetch limit reached, not queueing {}", url)
            }
        }
    }
}

/// Hands queued URLs to workers, one per free concurrency slot
async fn dispatch(ctx: Arc<CrawlContext>, results: UnboundedSender<PageResult>) {
    let mut workers = JoinSet::new();

    while let Some(ScheduledFetch { url, permit }) = ctx.scheduler.next().await {
        let ctx = ctx.clone();
        let results = results.clone();

        workers.spawn(async move {
            let result = process_url(&ctx, &url).await;
            drop(permit);
            // The collector only goes away when the run is over
            let _ = results.send(PageResult { url, result });
        });

        while let Some(done) = workers.try_join_next() {
            if let Err(e) = done {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }

    while let Some(done) = workers.join_next().await {
        if let Err(e) = done {
            tracing::error!("Worker task failed: {}", e);
        }
    }
}

/// Fetches one URL and captures the raw resources its page references
async fn process_url(ctx: &CrawlContext, url: &Url) -> Result<WorkerOutput, StaticatorError> {
    let page = fetch_page(
        &ctx.client,
        url,
        &ctx.rewriter,
        ctx.config.store_error_pages,
    )
    .await?;
    let mut captures = 0;

    if !page.discovered.captures.is_empty() {
        let resolver = RedirectResolver::new(&ctx.client, &ctx.hosts, ctx.store.as_ref());

        for target in &page.discovered.captures {
            let admit = |hop: &Url| ctx.scheduler.reserve_capture(hop);
            match resolver.save_raw(target, admit).await {
                Ok(true) => captures += 1,
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(url = %target, "Capture failed: {}", e),
            }
        }
    }

    Ok(WorkerOutput { page, captures })
}
