//! Feed an in-memory commit log through the adapter to a printing
//! projector while an appender keeps writing at the tail.
//!
//! Run with: `cargo run --example tail_projector`

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use weir::{AdapterConfig, CommitStreamAdapter, Result, StreamObserver, Transaction};
use weir_memlog::MemoryCommitLog;

struct PrintingProjector;

impl StreamObserver for PrintingProjector {
    fn on_next(&self, transactions: &[Arc<Transaction>]) -> Result<()> {
        for transaction in transactions {
            println!(
                "page item: {} on {} @ checkpoint {}",
                transaction.id, transaction.stream_id, transaction.checkpoint
            );
        }
        Ok(())
    }

    fn on_completed(&self) {
        println!("projection caught up and completed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let log = Arc::new(MemoryCommitLog::new());
    for n in 1..=5 {
        log.append_json("orders", json!({ "seq": n, "kind": "backlog" }));
    }

    let config = AdapterConfig {
        cache_size: 1_000,
        poll_interval_ms: 200,
        max_page_size: 3,
    };
    let adapter = Arc::new(CommitStreamAdapter::new(log.clone(), config)?);

    let subscription = adapter.subscribe(None, Arc::new(PrintingProjector)).await?;

    // Keep appending at the tail while the subscription drains.
    let appender_log = Arc::clone(&log);
    let appender = tokio::spawn(async move {
        for n in 6..=12 {
            appender_log.append_json("orders", json!({ "seq": n, "kind": "live" }));
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    });

    appender.await.expect("appender task");
    tokio::time::sleep(Duration::from_millis(500)).await;

    subscription.complete().await;
    adapter.dispose().await?;
    Ok(())
}
