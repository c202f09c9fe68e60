//! Story Storage Module
//!
//! Persistence layer behind the ingestion service.
//!
//! ## Core Concepts
//! - **Natural key**: every stored story is addressable by its `index`; at most one story exists per key.
//! - **Batch writes**: `insert_new` applies a whole batch atomically and skips keys that already exist,
//!   so uniqueness holds even when two ingestions race past the existence check.
//! - **Backends**: `SqliteStore` is the durable store, `MemoryStore` keeps everything in process.

pub mod memory;
pub mod sqlite;

use crate::ingestion::types::{NewStory, StoredStory};

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Returns the subset of `keys` that are already persisted, in a single query.
    async fn find_existing(&self, keys: &[String]) -> Result<HashSet<String>>;

    /// Persists `stories` as one atomic batch, ignoring keys that already exist.
    ///
    /// Returns the stories that were actually inserted. Concurrent readers see either none or
    /// all of the batch, and on error nothing from the batch is visible.
    async fn insert_new(&self, stories: Vec<NewStory>) -> Result<Vec<NewStory>>;

    async fn get(&self, index: &str) -> Result<Option<StoredStory>>;

    /// All stored stories, oldest first.
    async fn list(&self) -> Result<Vec<StoredStory>>;
}
