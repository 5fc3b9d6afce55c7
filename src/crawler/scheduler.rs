//! Scheduler for managing the crawl frontier and fetch concurrency
//!
//! This module handles:
//! - The FIFO frontier of URLs admitted for fetching
//! - The seen-set guaranteeing each normalized URL is admitted once
//! - The fetch budget, with overflow diagnostics once it is spent
//! - Outstanding-work accounting that decides when a run is complete
//! - Waking the dispatcher and gating fetches with a semaphore

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Outcome of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Newly admitted; it will be fetched
    Scheduled,

    /// Already admitted earlier in this run
    Seen,

    /// The fetch budget is spent; recorded as overflow
    Overflow,
}

/// Crawl run state shared by the dispatcher, the workers and the collector
///
/// All URLs passed in must already be normalized; their string form is the
/// dedup key.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
    captured: HashSet<String>,
    overflow: BTreeSet<String>,
    fetch_limit: usize,
    scheduled: usize,
    outstanding: usize,
    finished: bool,
}

impl Frontier {
    pub fn new(fetch_limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            captured: HashSet::new(),
            overflow: BTreeSet::new(),
            fetch_limit,
            scheduled: 0,
            outstanding: 0,
            finished: false,
        }
    }

    /// Offers a URL for crawling
    ///
    /// The seen check and insert happen together, so a URL discovered by two
    /// workers at once is admitted exactly once. A URL already fetched as a
    /// raw capture counts as seen. Admission counts against the fetch budget
    /// and adds one unit of outstanding work.
    pub fn admit(&mut self, url: &Url) -> Admission {
        if self.seen.contains(url.as_str()) || self.captured.contains(url.as_str()) {
            return Admission::Seen;
        }

        if self.scheduled >= self.fetch_limit {
            self.overflow.insert(url.to_string());
            return Admission::Overflow;
        }

        self.seen.insert(url.to_string());
        self.queue.push_back(url.clone());
        self.scheduled += 1;
        self.outstanding += 1;
        Admission::Scheduled
    }

    /// Reserves one fetch of the budget for a raw capture
    ///
    /// Captures are deduplicated among themselves and against crawled pages,
    /// but are never queued and never add outstanding work.
    pub fn reserve_capture(&mut self, url: &Url) -> bool {
        if self.seen.contains(url.as_str()) || self.captured.contains(url.as_str()) {
            return false;
        }

        if self.scheduled >= self.fetch_limit {
            self.overflow.insert(url.to_string());
            return false;
        }

        self.captured.insert(url.to_string());
        self.scheduled += 1;
        true
    }

    /// Takes the oldest queued URL
    pub fn pop(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    /// Marks one unit of outstanding work done, returning what remains
    pub fn complete(&mut self) -> usize {
        self.outstanding = self.outstanding.saturating_sub(1);
        self.outstanding
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of fetches reserved so far, pages and captures together
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Admitted URLs, sorted
    pub fn visited(&self) -> Vec<String> {
        let mut visited: Vec<String> = self.seen.iter().cloned().collect();
        visited.sort();
        visited
    }

    /// URLs found after the budget was spent, sorted
    pub fn overflow(&self) -> Vec<String> {
        self.overflow.iter().cloned().collect()
    }
}

/// A URL popped for fetching, with its concurrency slot
///
/// Dropping the permit frees the slot for the next fetch.
pub struct ScheduledFetch {
    pub url: Url,
    pub permit: OwnedSemaphorePermit,
}

/// Frontier plus the synchronization around it
///
/// One mutex guards the frontier; a `Notify` wakes the dispatcher when work
/// arrives or the run finishes; a semaphore caps fetches in flight.
pub struct Scheduler {
    frontier: Mutex<Frontier>,
    work_ready: Notify,
    semaphore: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(fetch_limit: usize, max_parallel: usize) -> Self {
        Self {
            frontier: Mutex::new(Frontier::new(fetch_limit)),
            work_ready: Notify::new(),
            semaphore: Arc::new(Semaphore::new(max_parallel)),
        }
    }

    /// Locks the frontier
    ///
    /// A poisoned lock is recovered: every frontier mutation leaves it
    /// consistent.
    pub fn frontier(&self) -> MutexGuard<'_, Frontier> {
        self.frontier.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offers a URL to the frontier, waking the dispatcher if it was admitted
    pub fn admit(&self, url: &Url) -> Admission {
        let admission = self.frontier().admit(url);
        if admission == Admission::Scheduled {
            self.work_ready.notify_one();
        }
        admission
    }

    pub fn reserve_capture(&self, url: &Url) -> bool {
        self.frontier().reserve_capture(url)
    }

    /// Marks one unit of outstanding work done, returning what remains
    pub fn complete(&self) -> usize {
        self.frontier().complete()
    }

    /// Ends the run; the dispatcher stops handing out work
    pub fn finish(&self) {
        self.frontier().finish();
        self.work_ready.notify_one();
    }

    /// Number of fetch slots currently free
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for the next URL to fetch and a free concurrency slot
    ///
    /// Returns `None` once the run is finished.
    pub async fn next(&self) -> Option<ScheduledFetch> {
        loop {
            let notified = self.work_ready.notified();

            let popped = {
                let mut frontier = self.frontier();
                if frontier.is_finished() {
                    return None;
                }
                frontier.pop()
            };

            match popped {
                Some(url) => {
                    let permit = self.semaphore.clone().acquire_owned().await.ok()?;
                    return Some(ScheduledFetch { url, permit });
                }
                None => notified.await,
            }
        }
    }
}
