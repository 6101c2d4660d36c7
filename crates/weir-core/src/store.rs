use crate::error::Result;
use crate::types::Commit;
use async_trait::async_trait;

/// The pull side of the adapter: an ordered, checkpointed commit log.
///
/// Implement this trait to feed the adapter from a concrete store
/// (a SQL event table, an append-only log, an in-memory log for tests).
#[async_trait]
pub trait CommitStore: Send + Sync {
    /// Return commits strictly after `checkpoint`, oldest first.
    ///
    /// The empty string is the "from the beginning" sentinel. The adapter
    /// applies its own page-size bound to the returned batch, so a store
    /// may return more commits than one page without harm.
    async fn get_from(&self, checkpoint: &str) -> Result<Vec<Commit>>;

    /// Release the store. Called once, after the last in-flight read
    /// has resolved.
    async fn close(&self) -> Result<()>;
}
