//! Cold reads, cache-served follow-ups, and full-page preloading.

mod support;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::{wait_until, RecordingStore};
use weir::{AdapterConfig, CommitStreamAdapter};

fn config(max_page_size: usize, poll_interval_ms: u64) -> AdapterConfig {
    AdapterConfig {
        cache_size: 1_000,
        poll_interval_ms,
        max_page_size,
    }
}

#[tokio::test]
async fn cold_read_returns_everything_after_the_cursor() {
    let store = Arc::new(RecordingStore::new());
    for n in 1..=3 {
        store.log.append_json("orders", json!({ "n": n }));
    }
    let adapter = CommitStreamAdapter::new(store.clone(), config(10, 100)).unwrap();

    let page = adapter.next_page(None).await.unwrap();

    assert_eq!(page.previous_checkpoint, "");
    assert_eq!(page.len(), 3);
    assert_eq!(page.last_checkpoint(), Some("3"));
    let tokens: Vec<&str> = page
        .transactions
        .iter()
        .map(|t| t.checkpoint.as_str())
        .collect();
    assert_eq!(tokens, vec!["1", "2", "3"]);
    assert_eq!(store.call_count(), 1);
    assert_eq!(store.cursors(), vec![""]);
}

#[tokio::test]
async fn follow_up_reads_are_served_from_the_cache() {
    let store = Arc::new(RecordingStore::new());
    for n in 1..=3 {
        store.log.append_json("orders", json!({ "n": n }));
    }
    let adapter = CommitStreamAdapter::new(store.clone(), config(10, 100)).unwrap();

    adapter.next_page(None).await.unwrap();
    assert_eq!(store.call_count(), 1);

    // The cold read cached {"" -> t1, "1" -> t2, "2" -> t3}; a reader at
    // "1" walks the chain without touching the store.
    let page = adapter.next_page(Some("1".to_string())).await.unwrap();
    let tokens: Vec<&str> = page
        .transactions
        .iter()
        .map(|t| t.checkpoint.as_str())
        .collect();
    assert_eq!(tokens, vec!["2", "3"]);
    assert_eq!(page.previous_checkpoint, "1");

    // The broken chain end may trigger a preload of "3", but the answer
    // above came from the cache: no fetch for "1" ever happens.
    assert!(!store.cursors().contains(&"1".to_string()));
}

#[tokio::test]
async fn full_page_triggers_a_preload_of_the_next_one() {
    let store = Arc::new(RecordingStore::new());
    for n in 1..=5 {
        store.log.append_json("orders", json!({ "n": n }));
    }
    let adapter = CommitStreamAdapter::new(store.clone(), config(3, 100)).unwrap();

    let page = adapter.next_page(None).await.unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page.last_checkpoint(), Some("3"));

    // Without any further caller, the full page provokes a fetch at "3".
    assert!(
        wait_until(Duration::from_secs(2), || store.call_count() == 2).await,
        "expected a preload fetch, saw cursors {:?}",
        store.cursors()
    );
    assert_eq!(store.cursors(), vec!["", "3"]);

    // The preloaded tail is served from the cache.
    let page = adapter.next_page(Some("3".to_string())).await.unwrap();
    let tokens: Vec<&str> = page
        .transactions
        .iter()
        .map(|t| t.checkpoint.as_str())
        .collect();
    assert_eq!(tokens, vec!["4", "5"]);
    assert_eq!(store.call_count(), 2);
}

#[tokio::test]
async fn oversized_store_batches_are_bounded_to_one_page() {
    let store = Arc::new(RecordingStore::new());
    for n in 1..=20 {
        store.log.append_json("orders", json!({ "n": n }));
    }
    let adapter = CommitStreamAdapter::new(store.clone(), config(4, 100)).unwrap();

    // The memory log returns all 20 commits; the adapter takes one page.
    let page = adapter.next_page(None).await.unwrap();
    assert_eq!(page.len(), 4);
    assert_eq!(page.last_checkpoint(), Some("4"));
}

#[tokio::test]
async fn pages_answer_the_cursor_they_were_asked_for() {
    let store = Arc::new(RecordingStore::new());
    for n in 1..=12 {
        store.log.append_json("orders", json!({ "n": n }));
    }
    let adapter = CommitStreamAdapter::new(store.clone(), config(5, 100)).unwrap();

    let page = adapter.next_page(Some("7".to_string())).await.unwrap();
    assert_eq!(page.previous_checkpoint, "7");
    let tokens: Vec<&str> = page
        .transactions
        .iter()
        .map(|t| t.checkpoint.as_str())
        .collect();
    assert_eq!(tokens, vec!["8", "9", "10", "11", "12"]);
}
