use super::error::IngestError;
use super::types::{IngestResult, NewStory};
use crate::storage::StoryStore;

use std::collections::HashSet;

/// Decodes a request body into candidate stories.
///
/// Anything other than a JSON array of `{title, index}` objects is a `MalformedRequest`.
pub fn parse_batch(body: &[u8]) -> Result<Vec<NewStory>, IngestError> {
    serde_json::from_slice(body).map_err(|e| IngestError::MalformedRequest(e.to_string()))
}

/// Ingests a batch of candidate stories, persisting only those whose natural key is new.
///
/// Performs at most one existence query and one batch insert against `store`.
pub async fn ingest_batch(
    store: &dyn StoryStore,
    candidates: Vec<NewStory>,
) -> Result<IngestResult, IngestError> {
    if candidates.is_empty() {
        return Ok(IngestResult::empty());
    }

    let keys = unique_keys(&candidates);
    if keys.is_empty() {
        return Err(IngestError::NoValidKeys);
    }

    let existing = store.find_existing(&keys).await?;
    let Partition {
        to_insert,
        mut already_exists,
        repeated_in_batch,
    } = partition(candidates, &existing);

    if to_insert.is_empty() {
        tracing::info!("All {} submitted stories already exist", already_exists.len());
        return Ok(IngestResult {
            message: IngestResult::ALL_EXIST.to_string(),
            inserted: Vec::new(),
            already_exists,
            repeated_in_batch,
        });
    }

    let attempted: Vec<String> = to_insert
        .iter()
        .filter_map(|story| story.natural_key().map(str::to_string))
        .collect();
    let inserted = store.insert_new(to_insert).await?;

    // Keys taken by a concurrent writer between the check and the insert.
    if inserted.len() < attempted.len() {
        let written: HashSet<&str> = inserted.iter().filter_map(NewStory::natural_key).collect();
        let lost: Vec<String> = attempted
            .into_iter()
            .filter(|key| !written.contains(key.as_str()))
            .collect();
        tracing::warn!("{} stories were persisted concurrently: {:?}", lost.len(), lost);
        already_exists.extend(lost);
    }

    tracing::info!(
        "Inserted {} stories, {} already existed",
        inserted.len(),
        already_exists.len()
    );

    Ok(IngestResult {
        message: IngestResult::OK.to_string(),
        inserted,
        already_exists,
        repeated_in_batch,
    })
}

/// Usable natural keys in first-seen order, without repeats.
fn unique_keys(candidates: &[NewStory]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter_map(NewStory::natural_key)
        .filter(|key| seen.insert(*key))
        .map(str::to_string)
        .collect()
}

struct Partition {
    to_insert: Vec<NewStory>,
    already_exists: Vec<String>,
    repeated_in_batch: Vec<String>,
}

/// Splits eligible candidates into new stories, stored keys and in-batch repeats.
///
/// Ineligible candidates are dropped. Only the first occurrence of a key is inserted or reported
/// as existing; every later occurrence goes to `repeated_in_batch`.
fn partition(candidates: Vec<NewStory>, existing: &HashSet<String>) -> Partition {
    let mut claimed = HashSet::new();
    let mut split = Partition {
        to_insert: Vec::new(),
        already_exists: Vec::new(),
        repeated_in_batch: Vec::new(),
    };

    for story in candidates {
        let Some(key) = story.natural_key().map(str::to_string) else {
            continue;
        };

        if existing.contains(&key) {
            if claimed.insert(key.clone()) {
                split.already_exists.push(key);
            } else {
                split.repeated_in_batch.push(key);
            }
        } else if claimed.insert(key.clone()) {
            split.to_insert.push(story);
        } else {
            split.repeated_in_batch.push(key);
        }
    }

    split
}
