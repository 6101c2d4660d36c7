//! # Weir
//!
//! Turns a pull-based commit store into a push-based, paged,
//! cache-coalesced transaction stream for read-model projectors.
//!
//! Many projectors want the same total order of committed transactions
//! from some checkpoint forward. Polling the store once per projector
//! duplicates work and overloads it; weir funnels every consumer through
//! one loader:
//!
//! - at most one read against the backing store is ever in flight, and
//!   concurrent consumers coalesce onto it
//! - later consumers are served from an LRU cache keyed by predecessor
//!   checkpoints
//! - a full page triggers a preload of the next one
//! - re-polls of a checkpoint known to be at the tail are rate-limited
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use weir::{AdapterConfig, CommitStreamAdapter, StreamObserver, Transaction};
//! use weir_memlog::MemoryCommitLog;
//!
//! struct Printer;
//!
//! impl StreamObserver for Printer {
//!     fn on_next(&self, transactions: &[Arc<Transaction>]) -> weir::Result<()> {
//!         for transaction in transactions {
//!             println!("{} @ {}", transaction.id, transaction.checkpoint);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> weir::Result<()> {
//! let log = Arc::new(MemoryCommitLog::new());
//! let adapter = CommitStreamAdapter::new(log.clone(), AdapterConfig::default())?;
//!
//! let subscription = adapter.subscribe(None, Arc::new(Printer)).await?;
//! // ... commits appended to `log` are pushed to the observer in pages ...
//! subscription.complete().await;
//! adapter.dispose().await?;
//! # Ok(())
//! # }
//! ```

mod adapter;
mod cache;
mod pager;
mod subscription;
mod tail;

pub use adapter::CommitStreamAdapter;
pub use cache::CheckpointCache;
pub use subscription::Subscription;

// Re-export the core contracts so most users depend on this crate alone.
pub use weir_core::{
    AdapterConfig, Commit, CommitEvent, CommitStore, EventEnvelope, Page, Result, StreamObserver,
    Transaction, WeirError,
};
