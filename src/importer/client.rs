use crate::ingestion::types::NewStory;

use anyhow::{Context, Result};

/// What the ingestion endpoint answered for a submitted batch.
#[derive(Debug)]
pub struct ImportOutcome {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends the whole batch in a single POST. Failures are returned, never retried.
pub async fn submit(
    client: &reqwest::Client,
    url: &str,
    stories: &[NewStory],
) -> Result<ImportOutcome> {
    let resp = client
        .post(url)
        .json(stories)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

    Ok(ImportOutcome { status, body })
}
