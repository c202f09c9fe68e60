//! Ingestion Data Types
//!
//! Defines the Data Transfer Objects (DTOs) exchanged with clients of the story endpoints
//! and the shape of records once they are persisted.

use serde::{Deserialize, Deserializer, Serialize};

/// A candidate story submitted by a client as part of a batch.
///
/// `index` is the natural key used for deduplication. The field must be present in the
/// payload, but it may be `null`; such candidates (and those with an empty key) are
/// ineligible and silently dropped by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewStory {
    pub title: String,
    #[serde(deserialize_with = "required_nullable")]
    pub index: Option<String>,
}

impl NewStory {
    pub fn new(title: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            index: Some(index.into()),
        }
    }

    /// Returns the natural key if it is usable for deduplication.
    pub fn natural_key(&self) -> Option<&str> {
        self.index.as_deref().filter(|key| !key.is_empty())
    }
}

// Without `#[serde(default)]` a missing field is still an error, while `null` maps to `None`.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// A story as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredStory {
    /// Storage-assigned surrogate id, increasing in insertion order.
    pub id: i64,
    pub title: String,
    pub index: String,
    /// Unix timestamp (ms) of the insert.
    pub created_at: u64,
}

/// Outcome of a successful batch ingestion.
///
/// `inserted` lists exactly the stories that became durable in this call. Keys that were
/// already stored (or taken by a concurrent writer) are reported in `already_exists`.
/// Later occurrences of a key that appears more than once in the batch are skipped and
/// listed in `repeated_in_batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub message: String,
    pub inserted: Vec<NewStory>,
    pub already_exists: Vec<String>,
    pub repeated_in_batch: Vec<String>,
}

impl IngestResult {
    pub const EMPTY_INPUT: &'static str = "empty input, no action taken";
    pub const ALL_EXIST: &'static str = "all submitted records already exist";
    pub const OK: &'static str = "ok";

    pub fn empty() -> Self {
        Self {
            message: Self::EMPTY_INPUT.to_string(),
            inserted: Vec::new(),
            already_exists: Vec::new(),
            repeated_in_batch: Vec::new(),
        }
    }
}

/// Query parameters accepted by the single-story lookup.
///
/// `index` is the historical parameter name, `key` the generic alias.
#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    pub index: Option<String>,
    pub key: Option<String>,
}

impl LookupParams {
    pub fn natural_key(&self) -> Option<&str> {
        [self.index.as_deref(), self.key.as_deref()]
            .into_iter()
            .flatten()
            .find(|key| !key.is_empty())
    }
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
