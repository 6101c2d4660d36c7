use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One event inside a committed transaction, as delivered to projectors.
///
/// The body is opaque to the adapter; headers are an open string→value map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub body: serde_json::Value,

    #[serde(default)]
    pub headers: HashMap<String, serde_json::Value>,
}

/// An immutable record of one commit, normalized from the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier of the originating commit.
    pub id: String,

    /// Stream the commit was written to.
    pub stream_id: String,

    /// Opaque, totally ordered token assigned by the backing store.
    ///
    /// The ordering is the store's; the adapter only ever compares
    /// checkpoints for equality.
    pub checkpoint: String,

    /// Wall clock at commit time.
    pub timestamp_utc: DateTime<Utc>,

    /// Events in commit order.
    pub events: Vec<EventEnvelope>,
}

/// One event inside a raw commit, as the backing store hands it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEvent {
    pub body: serde_json::Value,

    #[serde(default)]
    pub headers: HashMap<String, serde_json::Value>,
}

/// A raw commit read from the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub commit_id: String,
    pub stream_id: String,
    pub checkpoint_token: String,
    pub commit_stamp: DateTime<Utc>,
    pub events: Vec<CommitEvent>,
}

impl From<Commit> for Transaction {
    fn from(commit: Commit) -> Self {
        Transaction {
            id: commit.commit_id,
            stream_id: commit.stream_id,
            checkpoint: commit.checkpoint_token,
            timestamp_utc: commit.commit_stamp,
            events: commit
                .events
                .into_iter()
                .map(|event| EventEnvelope {
                    body: event.body,
                    headers: event.headers,
                })
                .collect(),
        }
    }
}

/// A bounded batch of transactions answering one cursor.
///
/// `previous_checkpoint` is the cursor the page answers: when the page is
/// non-empty, the first transaction is the direct successor of that
/// checkpoint and the rest follow in backing-store order.
#[derive(Debug, Clone)]
pub struct Page {
    pub previous_checkpoint: String,
    pub transactions: Vec<Arc<Transaction>>,
}

impl Page {
    pub fn new(previous_checkpoint: impl Into<String>, transactions: Vec<Arc<Transaction>>) -> Self {
        Self {
            previous_checkpoint: previous_checkpoint.into(),
            transactions,
        }
    }

    pub fn empty(previous_checkpoint: impl Into<String>) -> Self {
        Self::new(previous_checkpoint, Vec::new())
    }

    /// Checkpoint of the last transaction, or `None` when the page is empty.
    pub fn last_checkpoint(&self) -> Option<&str> {
        self.transactions
            .last()
            .map(|transaction| transaction.checkpoint.as_str())
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
