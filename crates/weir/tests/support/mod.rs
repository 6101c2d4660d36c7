#![allow(dead_code)]

//! Shared fixtures: an instrumented commit store and collecting observers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use weir::{Commit, CommitStore, Result, StreamObserver, Transaction, WeirError};
use weir_memlog::MemoryCommitLog;

pub struct CallRecord {
    pub cursor: String,
    pub started_at: Instant,
}

/// Wraps a [`MemoryCommitLog`] to record every fetch, gauge concurrency,
/// inject failures, and optionally slow reads down.
pub struct RecordingStore {
    pub log: MemoryCommitLog,
    calls: Mutex<Vec<CallRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Mutex<Duration>,
    failures_remaining: AtomicUsize,
    close_calls: AtomicUsize,
    closed_during_fetch: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            log: MemoryCommitLog::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
            failures_remaining: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            closed_during_fetch: AtomicBool::new(false),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        let store = Self::new();
        *store.delay.lock() = delay;
        store
    }

    /// Make the next `count` fetches fail before touching the log.
    pub fn inject_failures(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn cursors(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.cursor.clone()).collect()
    }

    pub fn call_started_at(&self, index: usize) -> Instant {
        self.calls.lock()[index].started_at
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn was_closed_during_fetch(&self) -> bool {
        self.closed_during_fetch.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommitStore for RecordingStore {
    async fn get_from(&self, checkpoint: &str) -> Result<Vec<Commit>> {
        self.calls.lock().push(CallRecord {
            cursor: checkpoint.to_string(),
            started_at: Instant::now(),
        });
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(concurrent, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(WeirError::Store("injected fetch failure".to_string()))
        } else {
            self.log.get_from(checkpoint).await
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.closed_during_fetch.store(true, Ordering::SeqCst);
        }
        self.log.close().await
    }
}

/// Records every delivery for later assertions.
#[derive(Default)]
pub struct CollectingObserver {
    pub pages: Mutex<Vec<Vec<Arc<Transaction>>>>,
    pub errors: Mutex<Vec<String>>,
    pub completions: AtomicUsize,
}

impl CollectingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// All delivered checkpoints, flattened in delivery order.
    pub fn checkpoints(&self) -> Vec<String> {
        self.pages
            .lock()
            .iter()
            .flatten()
            .map(|transaction| transaction.checkpoint.clone())
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn completion_count(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

impl StreamObserver for CollectingObserver {
    fn on_next(&self, transactions: &[Arc<Transaction>]) -> Result<()> {
        self.pages.lock().push(transactions.to_vec());
        Ok(())
    }

    fn on_error(&self, error: &WeirError) {
        self.errors.lock().push(error.to_string());
    }

    fn on_completed(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}

/// Delivers pages until one too many, then rejects.
pub struct FailingObserver {
    pub delivered: AtomicUsize,
    pub fail_on_page: usize,
    pub completions: AtomicUsize,
}

impl FailingObserver {
    pub fn failing_on(page: usize) -> Arc<Self> {
        Arc::new(Self {
            delivered: AtomicUsize::new(0),
            fail_on_page: page,
            completions: AtomicUsize::new(0),
        })
    }
}

impl StreamObserver for FailingObserver {
    fn on_next(&self, _transactions: &[Arc<Transaction>]) -> Result<()> {
        let page = self.delivered.fetch_add(1, Ordering::SeqCst) + 1;
        if page >= self.fail_on_page {
            return Err(WeirError::Observer("projection rejected page".to_string()));
        }
        Ok(())
    }

    fn on_completed(&self) {
        self.completions.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll `condition` until it holds or `deadline` elapses.
pub async fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
