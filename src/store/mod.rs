// src/store/mod.rs
// Read-only collaborators the engine queries. Implementations own their I/O;
// the matching code only sees snapshots.

pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;

use crate::models::{CandidateAttributes, StoredMessage};

pub use memory::InMemoryStore;

pub trait RecordStore: Send + Sync {
    /// Up to `max_count` active candidates of `category`.
    fn fetch_candidates(
        &self,
        category: &str,
        max_count: usize,
    ) -> impl Future<Output = Result<Vec<CandidateAttributes>>> + Send;
}

pub trait MessageStore: Send + Sync {
    /// Up to `max_count` messages created at or after `since`, newest first.
    fn fetch_messages(
        &self,
        since: DateTime<Utc>,
        max_count: usize,
    ) -> impl Future<Output = Result<Vec<StoredMessage>>> + Send;
}
