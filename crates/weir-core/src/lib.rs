//! Weir Core: types and traits for the weir commit-stream adapter
//!
//! This crate defines the contracts shared between the adapter and its
//! collaborators:
//! - `Commit` / `Transaction`: the backing store's wire shape and the
//!   normalized record handed to projectors
//! - `Page`: a bounded, ordered batch of transactions answering one cursor
//! - `CommitStore`: the pull side, an ordered, checkpointed commit log
//! - `StreamObserver`: the push side, the projector-facing callback surface
//! - `AdapterConfig`: paging, caching, and polling knobs

pub mod config;
pub mod error;
pub mod observer;
pub mod store;
pub mod types;

pub use config::AdapterConfig;
pub use error::{Result, WeirError};
pub use observer::StreamObserver;
pub use store::CommitStore;
pub use types::{Commit, CommitEvent, EventEnvelope, Page, Transaction};
