//! LRU cache mapping a predecessor checkpoint to its successor transaction.
//!
//! Keys are the checkpoints *preceding* each transaction, not transaction
//! ids: a reader holding cursor `C` asks "what comes after `C`?" and walks
//! the chain of answers. `DashMap` carries the entries; a mutex-guarded
//! recency list provides bounded LRU eviction.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use weir_core::Transaction;

type NodeIdx = usize;

struct Node {
    key: String,
    prev: Option<NodeIdx>,
    next: Option<NodeIdx>,
}

/// Doubly-linked recency order over cache keys, slab-allocated for O(1)
/// touch and tail eviction.
struct RecencyList {
    nodes: Vec<Node>,
    free: Vec<NodeIdx>,
    head: Option<NodeIdx>,
    tail: Option<NodeIdx>,
    index: HashMap<String, NodeIdx>,
}

impl RecencyList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    /// Promote `key` to most-recently-used. Returns false when the key is
    /// not tracked.
    fn touch(&mut self, key: &str) -> bool {
        let Some(&idx) = self.index.get(key) else {
            return false;
        };
        if self.head != Some(idx) {
            self.unlink(idx);
            self.attach_front(idx);
        }
        true
    }

    /// Track a new key as most-recently-used.
    fn push_front(&mut self, key: String) {
        let idx = match self.free.pop() {
            Some(recycled) => {
                self.nodes[recycled] = Node {
                    key: key.clone(),
                    prev: None,
                    next: None,
                };
                recycled
            }
            None => {
                self.nodes.push(Node {
                    key: key.clone(),
                    prev: None,
                    next: None,
                });
                self.nodes.len() - 1
            }
        };
        self.attach_front(idx);
        self.index.insert(key, idx);
    }

    /// Drop and return the least-recently-used key.
    fn evict_tail(&mut self) -> Option<String> {
        let idx = self.tail?;
        self.unlink(idx);
        let key = std::mem::take(&mut self.nodes[idx].key);
        self.index.remove(&key);
        self.free.push(idx);
        Some(key)
    }

    fn attach_front(&mut self, idx: NodeIdx) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: NodeIdx) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }
}

/// Thread-safe, bounded checkpoint→transaction cache with LRU eviction.
///
/// Capacity zero degenerates to a pass-through: every `get` misses and
/// `set` is a no-op. Two writers racing on the same key are permitted;
/// the later one wins.
pub struct CheckpointCache {
    entries: DashMap<String, Arc<Transaction>>,
    recency: Mutex<RecencyList>,
    capacity: usize,
}

impl CheckpointCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity),
            recency: Mutex::new(RecencyList::with_capacity(capacity)),
            capacity,
        }
    }

    /// Look up the transaction following `key`, marking it
    /// most-recently-used on a hit.
    pub fn get(&self, key: &str) -> Option<Arc<Transaction>> {
        if self.capacity == 0 {
            return None;
        }
        let hit = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;
        self.recency.lock().touch(key);
        Some(hit)
    }

    /// Insert or refresh `key`, evicting the least-recently-used entry
    /// when over capacity.
    pub fn set(&self, key: String, transaction: Arc<Transaction>) {
        if self.capacity == 0 {
            return;
        }
        debug_assert_ne!(
            key, transaction.checkpoint,
            "a transaction cannot be its own successor"
        );

        self.entries.insert(key.clone(), transaction);

        let evicted = {
            let mut recency = self.recency.lock();
            if !recency.touch(&key) {
                recency.push_front(key);
            }
            if recency.len() > self.capacity {
                recency.evict_tail()
            } else {
                None
            }
        };
        if let Some(stale) = evicted {
            self.entries.remove(&stale);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
