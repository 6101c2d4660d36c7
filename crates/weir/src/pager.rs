//! Page assembly over a single-flight loader.
//!
//! All concurrent readers are funneled through one in-flight fetch: the
//! first caller to find the slot empty installs a shared future and runs
//! the fetch on a detached task; everyone else awaits the same future.
//! The fetch populates the cache so coalesced callers whose cursor the
//! fetch did not answer are served on their next pass without touching
//! the store again.

use crate::cache::CheckpointCache;
use crate::tail::TailGate;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use weir_core::{AdapterConfig, CommitStore, Page, Result, Transaction, WeirError};

/// Handle to the one fetch currently in flight, shared by every waiter.
pub(crate) type InFlightLoad = Shared<BoxFuture<'static, Arc<Page>>>;

pub(crate) struct Pager {
    store: Arc<dyn CommitStore>,
    cache: CheckpointCache,
    tail: TailGate,
    in_flight: Mutex<Option<InFlightLoad>>,
    max_page_size: usize,
    disposed: Arc<AtomicBool>,
}

impl Pager {
    pub(crate) fn new(
        store: Arc<dyn CommitStore>,
        config: &AdapterConfig,
        disposed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            cache: CheckpointCache::new(config.cache_size),
            tail: TailGate::new(config.poll_interval()),
            in_flight: Mutex::new(None),
            max_page_size: config.max_page_size,
            disposed,
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// The load currently in flight, if any. Disposal awaits it so the
    /// store is not released under a running fetch.
    pub(crate) fn in_flight_load(&self) -> Option<InFlightLoad> {
        self.in_flight.lock().clone()
    }

    /// Produce the next page after `cursor`: from the cache when it is
    /// warm, otherwise through the single-flight loader.
    pub(crate) async fn next_page(self: &Arc<Self>, cursor: &str) -> Result<Page> {
        if self.is_disposed() {
            return Err(WeirError::Disposed);
        }

        let cached = self.page_from_cache(cursor);
        if !cached.is_empty() {
            return Ok(cached);
        }

        let page = self.load_sequentially(cursor).await;
        if page.len() == self.max_page_size {
            if let Some(last) = page.last_checkpoint() {
                self.start_preload(last.to_owned());
            }
        }
        Ok(page)
    }

    /// Walk the cached successor chain from `cursor`, up to one page.
    ///
    /// When the walk found at least one transaction and stopped on a miss
    /// rather than on the page bound, the next page is likely to be asked
    /// for soon; kick off a preload from where the chain broke.
    fn page_from_cache(self: &Arc<Self>, cursor: &str) -> Page {
        let Some(first) = self.cache.get(cursor) else {
            return Page::empty(cursor);
        };

        let mut last_checkpoint = first.checkpoint.clone();
        let mut transactions = vec![first];
        while transactions.len() < self.max_page_size {
            match self.cache.get(&last_checkpoint) {
                Some(next) => {
                    last_checkpoint = next.checkpoint.clone();
                    transactions.push(next);
                }
                None => {
                    self.start_preload(last_checkpoint);
                    break;
                }
            }
        }
        Page::new(cursor, transactions)
    }

    /// Loop until the loader produces a non-empty page answering `cursor`.
    ///
    /// Each round either serves this caller, warms the cache for it, or
    /// records a tail observation that throttles the next round; a caller
    /// coalesced onto a fetch for a different cursor simply re-enters.
    async fn load_sequentially(self: &Arc<Self>, cursor: &str) -> Page {
        loop {
            if self.is_disposed() {
                return Page::empty(cursor);
            }
            self.tail.wait_if_at_tail(cursor).await;

            let answer = self.begin_or_join(cursor).await;
            if answer.previous_checkpoint == cursor && !answer.is_empty() {
                return answer.as_ref().clone();
            }
        }
    }

    /// Fire-and-forget: one single-flight round for `checkpoint`, result
    /// ignored. The round re-checks the cache before touching the store.
    fn start_preload(self: &Arc<Self>, checkpoint: String) {
        if self.is_disposed() {
            return;
        }
        tracing::debug!(%checkpoint, "preloading next page");
        let _ = self.begin_or_join(&checkpoint);
    }

    /// Join the in-flight load, or install a fresh one for `cursor`.
    ///
    /// The fetch itself runs on a detached task: a subscriber cancelled
    /// while awaiting must not cancel a load other subscribers share. The
    /// task clears the slot *before* completing the shared future, so a
    /// waiter that observes completion can never re-join a stale slot.
    fn begin_or_join(self: &Arc<Self>, cursor: &str) -> InFlightLoad {
        let mut slot = self.in_flight.lock();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }

        let (complete, completion) = oneshot::channel::<Arc<Page>>();
        let load: InFlightLoad = completion
            .map(|resolved| resolved.unwrap_or_else(|_| Arc::new(Page::empty(""))))
            .boxed()
            .shared();
        *slot = Some(load.clone());
        drop(slot);

        let pager = Arc::clone(self);
        let cursor = cursor.to_owned();
        tokio::spawn(async move {
            let page = if pager.is_disposed() {
                Arc::new(Page::empty(cursor))
            } else {
                Arc::new(pager.try_load_next_page(&cursor).await)
            };
            *pager.in_flight.lock() = None;
            let _ = complete.send(page);
        });
        load
    }

    /// One fetch round, run by the single-flight owner.
    async fn try_load_next_page(self: &Arc<Self>, cursor: &str) -> Page {
        // A coalesced writer may have warmed the cache while this round
        // was being queued; don't hit the store for nothing.
        let cached = self.page_from_cache(cursor);
        if !cached.is_empty() {
            return cached;
        }

        let observed_at = Instant::now();
        let commits = match self.store.get_from(cursor).await {
            Ok(commits) => commits,
            Err(error) => {
                tracing::warn!(%cursor, %error, "commit store fetch failed; treating as empty");
                Vec::new()
            }
        };

        let transactions: Vec<Arc<Transaction>> = commits
            .into_iter()
            .take(self.max_page_size)
            .map(|commit| Arc::new(Transaction::from(commit)))
            .collect();
        tracing::debug!(%cursor, count = transactions.len(), "fetched commits");

        if transactions.len() < self.max_page_size {
            // A short batch means this fetch saw the tail; remember where
            // so re-polls past it are rate-limited.
            let tail_checkpoint = transactions
                .last()
                .map(|transaction| transaction.checkpoint.clone())
                .unwrap_or_else(|| cursor.to_owned());
            self.tail.record(tail_checkpoint, observed_at);
        }

        // Install the chain tail-first: a reader that finds the head must
        // find every successor of the same batch already present.
        for i in (1..transactions.len()).rev() {
            self.cache.set(
                transactions[i - 1].checkpoint.clone(),
                Arc::clone(&transactions[i]),
            );
        }
        if let Some(first) = transactions.first() {
            self.cache.set(cursor.to_owned(), Arc::clone(first));
        }

        Page::new(cursor, transactions)
    }
}
