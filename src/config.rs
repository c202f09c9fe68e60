use anyhow::{anyhow, bail, Context, Result};
use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use tracing::info;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_DB: &str = "stories.db";
pub const DEFAULT_LOG: &str = "info";

/// Installs the global fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let directives = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();
}

/// Falls back to `DEFAULT_LOG` when `directives` is unset or unparsable.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite(PathBuf),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store: StoreKind,
}

impl Config {
    /// Environment first (`STORY_BIND`, `STORY_STORE`, `STORY_DB`), then command-line overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env()?;
        config.apply_args(env::args().skip(1))?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let bind_addr = try_load("STORY_BIND", DEFAULT_BIND)?;
        let db_path: PathBuf = try_load("STORY_DB", DEFAULT_DB)?;

        let store = match try_load::<String>("STORY_STORE", "sqlite")?.as_str() {
            "sqlite" => StoreKind::Sqlite(db_path),
            "memory" => StoreKind::Memory,
            other => bail!("Invalid STORY_STORE value: {other} (expected sqlite or memory)"),
        };

        Ok(Self { bind_addr, store })
    }

    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bind" => {
                    let value = args.next().ok_or_else(|| anyhow!("--bind needs a value"))?;
                    self.bind_addr = value
                        .parse()
                        .with_context(|| format!("Invalid --bind address {value}"))?;
                }
                "--db" => {
                    let value = args.next().ok_or_else(|| anyhow!("--db needs a value"))?;
                    self.store = StoreKind::Sqlite(PathBuf::from(value));
                }
                "--memory" => self.store = StoreKind::Memory,
                other => bail!(
                    "Unknown argument {other}\nUsage: story-ingest [--bind <addr:port>] [--db <path> | --memory]"
                ),
            }
        }

        Ok(())
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}
