//! In-memory commit log backend for the weir adapter.
//!
//! `MemoryCommitLog` keeps committed transactions in an ordered vector and
//! assigns monotonically increasing checkpoint tokens. It backs the
//! integration tests and the examples; the adapter itself treats it like
//! any other [`CommitStore`].

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use weir_core::{Commit, CommitEvent, CommitStore, Result, WeirError};

/// An ordered, checkpointed commit log held entirely in memory.
#[derive(Default)]
pub struct MemoryCommitLog {
    commits: RwLock<Vec<Commit>>,
    next_token: AtomicU64,
    closed: AtomicBool,
}

impl MemoryCommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one commit with the given events, assigning the next
    /// checkpoint token. Returns the stored commit.
    pub fn append(&self, stream_id: impl Into<String>, events: Vec<CommitEvent>) -> Commit {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        let commit = Commit {
            commit_id: format!("commit-{token}"),
            stream_id: stream_id.into(),
            checkpoint_token: token.to_string(),
            commit_stamp: Utc::now(),
            events,
        };
        self.commits.write().push(commit.clone());
        commit
    }

    /// Convenience: append one commit carrying a single JSON event body.
    pub fn append_json(&self, stream_id: impl Into<String>, body: serde_json::Value) -> Commit {
        self.append(
            stream_id,
            vec![CommitEvent {
                body,
                headers: HashMap::new(),
            }],
        )
    }

    /// Number of commits currently in the log.
    pub fn len(&self) -> usize {
        self.commits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.read().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommitStore for MemoryCommitLog {
    async fn get_from(&self, checkpoint: &str) -> Result<Vec<Commit>> {
        if self.is_closed() {
            return Err(WeirError::Store("commit log is closed".to_string()));
        }

        let commits = self.commits.read();
        if checkpoint.is_empty() {
            return Ok(commits.clone());
        }

        // Tokens are opaque to callers; position them by equality, the way
        // a real store resolves a cursor, rather than by comparison.
        let position = commits
            .iter()
            .position(|commit| commit.checkpoint_token == checkpoint)
            .ok_or_else(|| WeirError::Store(format!("unknown checkpoint token: {checkpoint}")))?;

        Ok(commits[position + 1..].to_vec())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
