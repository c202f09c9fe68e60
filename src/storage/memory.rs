use super::StoryStore;
use crate::ingestion::types::{now_ms, NewStory, StoredStory};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Non-durable story store kept entirely in process memory.
///
/// Batch writes hold `gate` exclusively while a batch is checked and applied; reads hold it
/// shared, so a reader sees either none or all of a batch.
pub struct MemoryStore {
    stories: DashMap<String, StoredStory>,
    next_id: AtomicI64,
    gate: RwLock<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            stories: DashMap::new(),
            next_id: AtomicI64::new(1),
            gate: RwLock::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn find_existing(&self, keys: &[String]) -> Result<HashSet<String>> {
        let _read = self.gate.read().await;
        Ok(keys
            .iter()
            .filter(|key| self.stories.contains_key(key.as_str()))
            .cloned()
            .collect())
    }

    async fn insert_new(&self, stories: Vec<NewStory>) -> Result<Vec<NewStory>> {
        let _write = self.gate.write().await;

        let mut seen = HashSet::new();
        let fresh: Vec<NewStory> = stories
            .into_iter()
            .filter(|story| match story.natural_key() {
                Some(key) => !self.stories.contains_key(key) && seen.insert(key.to_string()),
                None => false,
            })
            .collect();

        let created_at = now_ms();
        let entries: Vec<StoredStory> = fresh
            .iter()
            .map(|story| StoredStory {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                title: story.title.clone(),
                index: story.natural_key().unwrap_or_default().to_string(),
                created_at,
            })
            .collect();

        for entry in entries {
            self.stories.insert(entry.index.clone(), entry);
        }

        tracing::debug!("Memory store inserted {} stories", fresh.len());
        Ok(fresh)
    }

    async fn get(&self, index: &str) -> Result<Option<StoredStory>> {
        let _read = self.gate.read().await;
        Ok(self.stories.get(index).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<StoredStory>> {
        let _read = self.gate.read().await;
        let mut all: Vec<StoredStory> = self
            .stories
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by_key(|story| story.id);
        Ok(all)
    }
}
