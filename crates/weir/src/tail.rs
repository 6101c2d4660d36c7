//! Throttle for repeated polls against the tail of the commit log.
//!
//! A single slot remembers the checkpoint last observed to be at the tail
//! and when that observation was made. Fetches for *that* checkpoint wait
//! out the remainder of the poll interval; fetches for any other cursor
//! proceed immediately, so cold reads are never slowed down.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// The most recent "this checkpoint was at the tail" sighting.
#[derive(Debug, Clone)]
pub(crate) struct TailObservation {
    pub checkpoint: String,
    pub observed_at: Instant,
}

pub(crate) struct TailGate {
    poll_interval: Duration,
    slot: Mutex<Option<TailObservation>>,
}

impl TailGate {
    pub(crate) fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            slot: Mutex::new(None),
        }
    }

    /// Overwrite the observation unconditionally; later sightings win.
    pub(crate) fn record(&self, checkpoint: String, observed_at: Instant) {
        *self.slot.lock() = Some(TailObservation {
            checkpoint,
            observed_at,
        });
    }

    pub(crate) fn snapshot(&self) -> Option<TailObservation> {
        self.slot.lock().clone()
    }

    /// When `cursor` matches the recorded tail checkpoint, sleep until a
    /// full poll interval has passed since the observation.
    pub(crate) async fn wait_if_at_tail(&self, cursor: &str) {
        let Some(observation) = self.snapshot() else {
            return;
        };
        if observation.checkpoint != cursor {
            return;
        }
        let resume_at = observation.observed_at + self.poll_interval;
        if resume_at > Instant::now() {
            tokio::time::sleep_until(resume_at.into()).await;
        }
    }
}
