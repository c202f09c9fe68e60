use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use story_ingest::config::init_logging;
use story_ingest::importer::{parse_csv, submit};

const DEFAULT_FILE: &str = "asset/task.csv";
const DEFAULT_URL: &str = "http://127.0.0.1:8787/api/story";

struct Args {
    file: PathBuf,
    url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let args = parse_args()?;

    tracing::info!("Reading CSV file {}", args.file.display());
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let stories = parse_csv(&text)?;
    tracing::info!("Generated {} stories", stories.len());
    // RUST_LOG=debug dumps the outgoing batch.
    tracing::debug!("{}", serde_json::to_string_pretty(&stories)?);

    tracing::info!("Sending POST request to {}", args.url);
    let outcome = submit(&reqwest::Client::new(), &args.url, &stories).await?;

    if outcome.is_success() {
        tracing::info!("Request succeeded: {}", outcome.body);
        Ok(())
    } else {
        tracing::error!("Request failed with status {}: {}", outcome.status, outcome.body);
        bail!("server answered {}", outcome.status)
    }
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        file: PathBuf::from(DEFAULT_FILE),
        url: std::env::var("STORY_API_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
    };

    let mut raw = std::env::args().skip(1);
    while let Some(flag) = raw.next() {
        match flag.as_str() {
            "--file" => {
                args.file = raw
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| anyhow!("--file needs a value"))?;
            }
            "--url" => {
                args.url = raw
                    .next()
                    .map(|url| url.trim_end_matches('/').to_string())
                    .ok_or_else(|| anyhow!("--url needs a value"))?;
            }
            other => bail!("Unknown argument {other}\nUsage: importer [--file <csv>] [--url <endpoint>]"),
        }
    }

    Ok(args)
}
