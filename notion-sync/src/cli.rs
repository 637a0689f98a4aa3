//! Command-line surface of notion-sync.
//!
//! Parses arguments, resolves configuration, wires the Notion client and the
//! filesystem store into [`synchronise`], and prints a one-line summary.
//! All pipeline logic lives in `notion-sync-core`.

use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use notion_sync_core::artifact::FsArtifactStore;
use notion_sync_core::notion::NotionClient;
use notion_sync_core::synchronise::{synchronise, today};
use std::path::PathBuf;

/// Publish the pages of a Notion database as static HTML plus a JSON manifest.
#[derive(Parser)]
#[clap(
    name = "notion-sync",
    version,
    about = "Render published Notion pages into standalone HTML documents and a posts manifest"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch published pages and (re)write every document and the manifest
    Sync {
        /// Optional YAML config file; defaults apply when omitted
        #[clap(long)]
        config: Option<PathBuf>,
        /// Directory for documents and the manifest, overriding the config file
        #[clap(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config, output_dir } => {
            let mut config = load_config(config)?;
            if let Some(dir) = output_dir {
                config.sync.output_dir = dir;
            }
            config.sync.trace_loaded();
            tracing::info!(command = "sync", "Starting synchronisation process");

            let client = NotionClient::new(config.notion, config.sync.filter.clone())
                .map_err(|e| anyhow::anyhow!("Failed to build Notion client: {e}"))?;
            let store = FsArtifactStore::from_config(&config.sync);

            match synchronise(&config.sync, &client, &client, &store, today()).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    println!("Sync finished: {}", report.summary());
                    for skipped in &report.skipped {
                        println!(
                            "  skipped {} at {}: {}",
                            skipped.record_id, skipped.stage, skipped.reason
                        );
                    }
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
