//! # SQLite
//!
//! Durable story store.
//!
//! ## Schema
//! - Table `stories`: `id` (surrogate, autoincrement), `title`, `natural_key` (**UNIQUE**), `created_at` (ms)
//!
//! ## Implementation
//! - One connection behind a mutex; every call runs on the blocking pool
//! - Batch inserts run inside an `IMMEDIATE` transaction with `INSERT OR IGNORE`, so the unique
//!   constraint is the final word on duplicates and a failed batch rolls back as a whole
//! - Existence checks are a single `IN (...)` query, split only past the bound-parameter limit

use super::StoryStore;
use crate::ingestion::types::{now_ms, NewStory, StoredStory};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS stories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    natural_key TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);";

/// `SQLITE_MAX_VARIABLE_NUMBER` of the bundled SQLite (>= 3.32).
pub(crate) const MAX_BOUND_KEYS: usize = 32_766;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open sqlite database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        tracing::info!("Opened sqlite store at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| anyhow!("sqlite connection mutex poisoned"))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| anyhow!("sqlite task failed: {}", e))?
    }
}

/// One `IN (...)` statement per run of keys that fits in the bound-parameter limit.
pub(crate) fn existence_statements(keys: &[String]) -> Vec<(String, &[String])> {
    keys.chunks(MAX_BOUND_KEYS)
        .map(|chunk| {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT natural_key FROM stories WHERE natural_key IN ({})",
                placeholders
            );
            (sql, chunk)
        })
        .collect()
}

fn story_from_row(row: &Row<'_>) -> rusqlite::Result<StoredStory> {
    Ok(StoredStory {
        id: row.get("id")?,
        title: row.get("title")?,
        index: row.get("natural_key")?,
        created_at: row.get::<_, i64>("created_at")? as u64,
    })
}

#[async_trait]
impl StoryStore for SqliteStore {
    async fn find_existing(&self, keys: &[String]) -> Result<HashSet<String>> {
        let keys = keys.to_vec();

        self.run(move |conn| {
            let mut existing: HashSet<String> = HashSet::new();

            for (sql, chunk) in existence_statements(&keys) {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                    row.get::<_, String>(0)
                })?;
                for key in rows {
                    existing.insert(key?);
                }
            }

            Ok(existing)
        })
        .await
    }

    async fn insert_new(&self, stories: Vec<NewStory>) -> Result<Vec<NewStory>> {
        self.run(move |conn| {
            let created_at = now_ms() as i64;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut inserted = Vec::with_capacity(stories.len());

            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR IGNORE INTO stories (title, natural_key, created_at) VALUES (?1, ?2, ?3)",
                )?;

                for story in stories {
                    let changed = match story.natural_key() {
                        Some(key) => stmt.execute(params![story.title, key, created_at])?,
                        None => continue,
                    };
                    if changed == 1 {
                        inserted.push(story);
                    }
                }
            }

            // Dropping `tx` on any early return above rolls the batch back.
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn get(&self, index: &str) -> Result<Option<StoredStory>> {
        let index = index.to_string();

        self.run(move |conn| {
            let story = conn
                .query_row(
                    "SELECT id, title, natural_key, created_at FROM stories WHERE natural_key = ?1",
                    params![index],
                    story_from_row,
                )
                .optional()?;
            Ok(story)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<StoredStory>> {
        self.run(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, natural_key, created_at FROM stories ORDER BY id")?;
            let stories = stmt
                .query_map([], story_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(stories)
        })
        .await
    }
}
