//! CSV Importer Module
//!
//! Converts a CSV export into a story batch and submits it to the ingestion endpoint.
//!
//! ## Workflow
//! 1. **Parse**: The header row must name an `id` and a `text` column (any position).
//! 2. **Map**: Each row becomes `{ title: text, index: id }` with the id zero-padded to four digits.
//! 3. **Submit**: The whole batch is sent in a single POST. There is no retry; the server's
//!    response (or error) is handed back to the operator.

pub mod client;
pub mod parser;

pub use client::{submit, ImportOutcome};
pub use parser::{pad_id, parse_csv, ImportError, DEFAULT_ID_WIDTH};
