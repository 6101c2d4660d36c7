//! The adapter facade: subscriptions in, pages out, orderly shutdown.

use crate::pager::Pager;
use crate::subscription::{self, Registry, Subscription, SubscriptionInner};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use weir_core::{AdapterConfig, CommitStore, Page, Result, StreamObserver};

/// Turns a pull-based [`CommitStore`] into a push-based, paged stream of
/// transactions, coalescing all consumers onto one in-flight read.
///
/// The adapter owns the backing store: [`dispose`](Self::dispose) cancels
/// every subscription, waits out the in-flight read, and releases the
/// store. It must be used inside a tokio runtime.
pub struct CommitStreamAdapter {
    store: Arc<dyn CommitStore>,
    pager: Arc<Pager>,
    registry: Arc<Registry>,
    disposed: Arc<AtomicBool>,
    dispose_lock: tokio::sync::Mutex<()>,
    next_subscription_id: AtomicU64,
}

impl CommitStreamAdapter {
    pub fn new(store: Arc<dyn CommitStore>, config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let disposed = Arc::new(AtomicBool::new(false));
        let pager = Arc::new(Pager::new(
            Arc::clone(&store),
            &config,
            Arc::clone(&disposed),
        ));
        let registry = Registry::new(Arc::clone(&disposed));
        Ok(Self {
            store,
            pager,
            registry,
            disposed,
            dispose_lock: tokio::sync::Mutex::new(()),
            next_subscription_id: AtomicU64::new(1),
        })
    }

    /// Pull one page of transactions past `checkpoint` (`None` means from
    /// the beginning). Blocks until a non-empty page is available.
    pub async fn next_page(&self, checkpoint: Option<String>) -> Result<Page> {
        let cursor = checkpoint.unwrap_or_default();
        self.pager.next_page(&cursor).await
    }

    /// Start pushing pages past `checkpoint` to `observer` on a dedicated
    /// worker task. `None` subscribes from the beginning of the log.
    pub async fn subscribe(
        &self,
        checkpoint: Option<String>,
        observer: Arc<dyn StreamObserver>,
    ) -> Result<Subscription> {
        let cursor = checkpoint.unwrap_or_default();
        let id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);

        let inner = SubscriptionInner::new(id, observer, Arc::downgrade(&self.registry));
        self.registry.register(Arc::clone(&inner))?;

        let worker = subscription::spawn_worker(Arc::clone(&self.pager), Arc::clone(&inner), cursor);
        inner.attach_worker(worker).await;

        tracing::info!(subscription = id, "subscription started");
        Ok(Subscription::new(inner))
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Shut the adapter down: cancel every subscription, wait for the
    /// in-flight read to resolve, then release the backing store.
    ///
    /// Serialized and idempotent; every call after the first is a no-op.
    pub async fn dispose(&self) -> Result<()> {
        let _serial = self.dispose_lock.lock().await;
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("disposing commit-stream adapter");

        for live in self.registry.snapshot() {
            live.complete().await;
        }

        // The store must not be released under a running fetch.
        if let Some(load) = self.pager.in_flight_load() {
            let _ = load.await;
        }

        self.store.close().await?;
        tracing::info!("commit-stream adapter disposed");
        Ok(())
    }
}

impl std::fmt::Debug for CommitStreamAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitStreamAdapter")
            .field("disposed", &self.is_disposed())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
