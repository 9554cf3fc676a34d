//! WAV DAC Player (wdp-player) - Main entry point
//!
//! Plays mono PCM WAV files from the root folder through a double-buffered
//! codec. With a FILE argument it plays that file once and exits; otherwise
//! it runs the interactive shell.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wdp_common::events::PlayerEvent;
use wdp_player::audio::{Codec, CpalCodec, VirtualDac};
use wdp_player::config::{OutputKind, PlayerConfig};
use wdp_player::shell::run_shell;
use wdp_player::storage::FsStorage;
use wdp_player::Player;

/// Command-line arguments for wdp-player
#[derive(Parser, Debug)]
#[command(name = "wdp-player")]
#[command(about = "Stream mono PCM WAV files to a DAC")]
#[command(version)]
struct Args {
    /// Root folder (mounted volume) containing WAV files
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output backend
    #[arg(short, long, value_enum)]
    output: Option<OutputKind>,

    /// Audio output device name
    #[arg(short, long)]
    device: Option<String>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Play this file once and exit
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for device in CpalCodec::list_devices().context("Failed to list audio devices")? {
            println!("{}", device);
        }
        return Ok(());
    }

    let root_folder = config.resolve_root_folder(args.root_folder.as_deref());
    info!("Root folder: {}", root_folder.display());

    let output = args.output.unwrap_or(config.output);
    let codec: Box<dyn Codec> = match output {
        OutputKind::Cpal => Box::new(
            CpalCodec::open(args.device.or(config.device.clone())).context("Failed to open audio output")?,
        ),
        OutputKind::Virtual => Box::new(VirtualDac::new()),
    };
    info!("Output: {:?}", output);

    let player = Arc::new(Player::new(
        FsStorage::new(root_folder),
        codec,
        config.player_settings(),
    ));

    match args.file {
        Some(file) => play_once(player, file).await,
        None => run_shell(player).await,
    }
}

/// Play one file to its end (or Ctrl+C)
async fn play_once(player: Arc<Player<FsStorage, Box<dyn Codec>>>, file: PathBuf) -> Result<()> {
    let mut events = player.subscribe();

    let worker = Arc::clone(&player);
    let shown = file.display().to_string();
    tokio::task::spawn_blocking(move || worker.play(&file))
        .await?
        .with_context(|| format!("Cannot play {}", shown))?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event @ PlayerEvent::SessionFinished { .. }) => {
                    println!("{}", event);
                    break;
                }
                Ok(event) => println!("{}", event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} player events", missed),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping playback");
                break;
            }
        }
    }

    let worker = Arc::clone(&player);
    tokio::task::spawn_blocking(move || worker.stop()).await?;
    Ok(())
}
