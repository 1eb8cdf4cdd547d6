//! Ghostseed CLI - announce fabricated transfer statistics to trackers
//!
//! Loads a torrent file, validates the requested starting counters and
//! speeds, then runs the announce loop alongside the countdown and status
//! rendering tasks until interrupted.

mod display;
mod input;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ghostseed_core::announce::SessionParams;
use ghostseed_core::{AnnounceSession, SharedState, SpoofConfig, TorrentMetadata, scheduler};
use tracing_subscriber::EnvFilter;

use crate::display::StatusHeader;

#[derive(Parser)]
#[command(name = "ghostseed")]
#[command(about = "Reports fabricated transfer statistics to BitTorrent trackers")]
struct Cli {
    /// Path to the .torrent file
    #[arg(short, long)]
    torrent: PathBuf,

    /// Initial downloaded amount and download speed, e.g. `37% 120kbps`
    #[arg(short, long, num_args = 2, required = true, value_names = ["AMOUNT", "SPEED"])]
    download: Vec<String>,

    /// Initial uploaded amount and upload speed, e.g. `0b 80kbps`
    #[arg(short, long, num_args = 2, required = true, value_names = ["AMOUNT", "SPEED"])]
    upload: Vec<String>,

    /// Console log level filter, e.g. `warn` or `ghostseed_core=debug`
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let raw = std::fs::read(&cli.torrent)
        .with_context(|| format!("failed to read torrent file {}", cli.torrent.display()))?;
    let metadata = TorrentMetadata::from_bencode(&raw)?;

    let params = SessionParams {
        initial_downloaded: input::parse_initial_downloaded(
            &cli.download[0],
            metadata.total_size,
            metadata.piece_size,
        )?,
        initial_uploaded: input::parse_size(
            &cli.upload[0],
            metadata.total_size,
            metadata.piece_size,
        )?,
        download_speed_kbps: input::parse_speed(&cli.download[1])?,
        upload_speed_kbps: input::parse_speed(&cli.upload[1])?,
    };

    let config = SpoofConfig::from_env();
    let shared = SharedState::new();
    let header = StatusHeader {
        torrent_name: metadata.name.clone(),
        total_size: metadata.total_size,
        download_speed_kbps: params.download_speed_kbps,
        upload_speed_kbps: params.upload_speed_kbps,
    };

    let mut session = AnnounceSession::new(metadata, &config, params, Arc::clone(&shared));

    scheduler::spawn_countdown(Arc::clone(&shared));
    display::spawn_status(Arc::clone(&shared), header);

    let loop_result = tokio::select! {
        result = scheduler::run(&mut session) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match loop_result {
        Some(result) => result.context("announce loop failed")?,
        None => {
            tracing::info!("interrupt received, sending farewell announce");
            if let Err(e) = session.shutdown().await {
                tracing::warn!("farewell announce failed: {e}");
            }
        }
    }

    Ok(())
}
