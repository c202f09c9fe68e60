//! Ingestion Service Module
//!
//! Accepts batches of stories and persists only those whose natural key (`index`) is not yet stored.
//!
//! ## Workflow
//! 1. **Decode**: The request body must be a JSON array of `{title, index}` objects.
//! 2. **Filter**: Candidates without a usable key are dropped; a batch with no usable keys is rejected.
//! 3. **Dedupe**: One batched existence query splits the batch into new and already-stored stories.
//! 4. **Persist**: New stories are written in a single atomic batch backed by the store's unique key.
//!
//! Re-submitting a batch never changes the stored state beyond the first successful submission.

pub mod error;
pub mod handlers;
pub mod service;
pub mod types;
