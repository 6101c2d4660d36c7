//! Long-running per-observer workers and their bookkeeping.
//!
//! Each subscription owns one tokio task that repeatedly pulls the next
//! page past its cursor and pushes it to the observer. Cancellation is a
//! `Notify` raced against the page future; the shared in-flight load is
//! never cancelled by a departing subscriber (it runs detached, see the
//! pager).

use crate::pager::Pager;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use weir_core::{Result, StreamObserver, WeirError};

/// The adapter's set of live subscriptions.
///
/// Registration and the disposed flag are checked under the same lock, so
/// no subscription can slip past a concurrent disposal: it is either
/// refused, or included in the disposal sweep.
pub(crate) struct Registry {
    subscriptions: Mutex<Vec<Arc<SubscriptionInner>>>,
    disposed: Arc<AtomicBool>,
}

impl Registry {
    pub(crate) fn new(disposed: Arc<AtomicBool>) -> Arc<Self> {
        Arc::new(Self {
            subscriptions: Mutex::new(Vec::new()),
            disposed,
        })
    }

    pub(crate) fn register(&self, subscription: Arc<SubscriptionInner>) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock();
        if self.disposed.load(Ordering::SeqCst) {
            return Err(WeirError::Disposed);
        }
        subscriptions.push(subscription);
        Ok(())
    }

    pub(crate) fn remove(&self, id: u64) {
        self.subscriptions
            .lock()
            .retain(|subscription| subscription.id != id);
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<SubscriptionInner>> {
        self.subscriptions.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

pub(crate) struct SubscriptionInner {
    pub(crate) id: u64,
    observer: Arc<dyn StreamObserver>,
    cancel: Notify,
    cancelled: AtomicBool,
    failed: AtomicBool,
    completed: AtomicBool,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    registry: Weak<Registry>,
}

impl SubscriptionInner {
    pub(crate) fn new(
        id: u64,
        observer: Arc<dyn StreamObserver>,
        registry: Weak<Registry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            observer,
            cancel: Notify::new(),
            cancelled: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            worker: tokio::sync::Mutex::new(None),
            registry,
        })
    }

    pub(crate) async fn attach_worker(&self, handle: JoinHandle<()>) {
        *self.worker.lock().await = Some(handle);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn deregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Cancel the worker, await its exit, deregister, and signal normal
    /// completion at most once. Safe to call any number of times, from
    /// any number of tasks; all callers return only after the worker has
    /// exited.
    pub(crate) async fn complete(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel.notify_one();

        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if handle.await.is_err() {
                tracing::error!(subscription = self.id, "subscription worker panicked");
                self.mark_failed();
            }
        }
        drop(worker);

        self.deregister();
        if !self.has_failed() && !self.completed.swap(true, Ordering::SeqCst) {
            self.observer.on_completed();
        }
    }
}

/// Spawn the worker loop for one subscription.
pub(crate) fn spawn_worker(
    pager: Arc<Pager>,
    subscription: Arc<SubscriptionInner>,
    start_cursor: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut cursor = start_cursor;
        loop {
            if subscription.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                _ = subscription.cancel.notified() => None,
                result = pager.next_page(&cursor) => Some(result),
            };
            let Some(result) = outcome else {
                break;
            };

            match result {
                Ok(page) => {
                    if page.is_empty() {
                        // Only produced while shutting down; the next
                        // iteration observes the flag and exits.
                        continue;
                    }
                    if let Err(error) = subscription.observer.on_next(&page.transactions) {
                        tracing::warn!(
                            subscription = subscription.id,
                            %error,
                            "observer rejected page; terminating subscription"
                        );
                        subscription.mark_failed();
                        subscription.deregister();
                        break;
                    }
                    if let Some(last) = page.last_checkpoint() {
                        cursor = last.to_owned();
                    }
                }
                Err(WeirError::Disposed) => break,
                Err(error) => {
                    tracing::warn!(
                        subscription = subscription.id,
                        %error,
                        "page load failed; terminating subscription"
                    );
                    subscription.mark_failed();
                    subscription.observer.on_error(&error);
                    subscription.deregister();
                    break;
                }
            }
        }
    })
}

/// Handle returned by `subscribe`; completing it cancels the worker.
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub(crate) fn new(inner: Arc<SubscriptionInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn has_failed(&self) -> bool {
        self.inner.has_failed()
    }

    /// Cancel the subscription and wait for its worker to exit.
    ///
    /// Idempotent. When the subscription has not failed, the observer
    /// receives `on_completed` exactly once.
    pub async fn complete(&self) {
        self.inner.complete().await;
    }
}
