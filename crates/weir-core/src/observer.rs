use crate::error::{Result, WeirError};
use crate::types::Transaction;
use std::sync::Arc;

/// The push side of the adapter: where a subscription delivers pages.
///
/// Calls on a given observer are serialized (one worker per subscription),
/// so implementations need not tolerate concurrent `on_next` calls.
pub trait StreamObserver: Send + Sync {
    /// Deliver one page of transactions, in backing-store order.
    ///
    /// Returning an error terminates the subscription; it will not retry
    /// or redeliver.
    fn on_next(&self, transactions: &[Arc<Transaction>]) -> Result<()>;

    /// The subscription failed and will emit nothing further.
    fn on_error(&self, _error: &WeirError) {}

    /// The subscription terminated normally and will emit nothing further.
    fn on_completed(&self) {}
}
