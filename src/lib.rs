//! Story Ingestion Service Library
//!
//! This library crate defines the modules behind the story publishing backend.
//! It serves as the foundation for the server binary (`main.rs`) and the CSV `importer`.
//!
//! ## Modules
//! - **`ingestion`**: Idempotent batch ingestion. Decodes batches of `{title, index}` records,
//!   deduplicates them by natural key and persists only the new ones in one atomic write.
//! - **`storage`**: The `StoryStore` abstraction with a durable SQLite backend and an in-memory one.
//! - **`server`**: Router, method dispatch and graceful shutdown around the ingestion handlers.
//! - **`config`**: Environment and command-line configuration for the server binary.
//! - **`importer`**: Turns a CSV export into a batch and submits it to the ingestion endpoint.

pub mod config;
pub mod importer;
pub mod ingestion;
pub mod server;
pub mod storage;
