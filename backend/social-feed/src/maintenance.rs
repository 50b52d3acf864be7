//! Repost maintenance commands behind the `repost-tool` binary.
//!
//! Commands run against the JSON snapshot named by `STORE_SNAPSHOT_PATH`.
//! The snapshot is written back after every command, including one that
//! failed part-way, so batches that were committed are never lost.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::Config;
use crate::services::{RepostSynthesizer, SynthesisReport};
use crate::store::MemoryStore;

pub const USAGE: &str = "usage: repost-tool <generate <post-id> [count] | purge <post-id>>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create reposts; `count` falls back to `REPOST_DEFAULT_COUNT`.
    Generate {
        post_id: String,
        count: Option<usize>,
    },
    Purge {
        post_id: String,
    },
    Help,
}

impl Command {
    /// Parse command-line arguments, program name excluded.
    pub fn parse(args: &[String]) -> Result<Self> {
        let command = args.first().map(String::as_str).unwrap_or("help");
        match command {
            "generate" => {
                let post_id = args.get(1).context(USAGE)?.clone();
                let count = match args.get(2) {
                    Some(raw) => Some(
                        raw.parse::<usize>()
                            .with_context(|| format!("invalid count: {:?}", raw))?,
                    ),
                    None => None,
                };
                Ok(Command::Generate { post_id, count })
            }
            "purge" | "delete" => Ok(Command::Purge {
                post_id: args.get(1).context(USAGE)?.clone(),
            }),
            "help" | "--help" | "-h" => Ok(Command::Help),
            other => bail!("unknown command: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Generated(SynthesisReport),
    Purged(usize),
    Usage,
}

/// Fallback tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter(config: &Config) -> String {
    format!("repost_tool={0},social_feed={0}", config.app.log_level.trim())
}

/// Open the configured snapshot, run `command` and persist the result.
pub async fn run(config: &Config, command: Command) -> Result<Outcome> {
    if command == Command::Help {
        return Ok(Outcome::Usage);
    }
    config.validate()?;

    let store = Arc::new(
        MemoryStore::open_snapshot(&config.store.snapshot_path, config.store_limits())
            .context("Failed to open document store snapshot")?,
    );
    run_on(&store, config, command).await
}

/// Run `command` on an already opened store and persist it to the
/// configured snapshot path.
pub async fn run_on(
    store: &Arc<MemoryStore>,
    config: &Config,
    command: Command,
) -> Result<Outcome> {
    let snapshot_path = &config.store.snapshot_path;
    let synthesizer = RepostSynthesizer::new(Arc::clone(store), config.snippet_generator()?);

    let result = match command {
        Command::Generate { post_id, count } => {
            let count = count.unwrap_or(config.repost.default_count);
            info!(post_id = %post_id, count, snapshot = %snapshot_path, "Generating reposts");
            synthesizer
                .synthesize(&post_id, count, &config.repost.bounding_box)
                .await
                .map(Outcome::Generated)
        }
        Command::Purge { post_id } => synthesizer.purge(&post_id).await.map(Outcome::Purged),
        Command::Help => return Ok(Outcome::Usage),
    };

    store.persist(snapshot_path)?;
    Ok(result?)
}
