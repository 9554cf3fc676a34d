//! Interactive command shell
//!
//! Line-oriented front end over a [`Player`]: `play <file>`, `stop`,
//! `status`, `tree`, `help` and `exit`. Command parsing and execution are
//! synchronous; [`run_shell`] wires them to stdin on the tokio runtime and
//! prints session events as they arrive.

use crate::audio::codec::Codec;
use crate::error::{Error, Result};
use crate::playback::Player;
use crate::storage::FsStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const PLAY_USAGE: &str = "Usage: play filename";

const HELP: &str = "\
Commands:
  play <file.wav>  Play a mono PCM WAV file from the root folder
  stop             Stop playback
  status           Show player state
  tree             List files under the root folder
  help             Show this help
  exit             Stop playback and quit";

/// One parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(PathBuf),
    Stop,
    Status,
    Tree,
    Help,
    Exit,
}

/// Result of executing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text to print (may be empty)
    Text(String),
    /// Leave the shell
    Exit,
}

/// Parse one input line. Blank lines yield `None`.
///
/// `play` takes exactly one argument ending in `.wav` (case-sensitive).
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match name {
        "play" => match args.as_slice() {
            [file] if file.ends_with(".wav") => Command::Play(PathBuf::from(file)),
            _ => return Err(Error::InvalidCommand(PLAY_USAGE.to_string())),
        },
        "stop" => Command::Stop,
        "status" => Command::Status,
        "tree" => Command::Tree,
        "help" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => {
            return Err(Error::InvalidCommand(format!(
                "Unknown command '{}', type 'help' for a list",
                other
            )))
        }
    };
    Ok(Some(command))
}

/// Execute `command` against `player`.
///
/// Blocks while a previous session is being shut down.
pub fn execute<C: Codec>(player: &Player<FsStorage, C>, command: Command) -> Result<Reply> {
    match command {
        Command::Play(path) => {
            player.play(&path)?;
            Ok(Reply::Text(String::new()))
        }
        Command::Stop => {
            player.stop();
            Ok(Reply::Text(String::new()))
        }
        Command::Status => {
            let mut status = format!("state: {}", player.state());
            if let Some(outcome) = player.last_outcome() {
                status.push_str(&format!("\nlast session: {}", outcome));
            }
            Ok(Reply::Text(status))
        }
        Command::Tree => {
            let storage = player.storage();
            let files = storage.list_files().map_err(Error::FileReadError)?;
            let mut listing = format!("{}", storage.root().display());
            for file in files {
                listing.push_str(&format!("\n  {}", file.display()));
            }
            Ok(Reply::Text(listing))
        }
        Command::Help => Ok(Reply::Text(HELP.to_string())),
        Command::Exit => {
            player.stop();
            Ok(Reply::Exit)
        }
    }
}

/// Run the interactive shell until `exit`, end of input or Ctrl+C
pub async fn run_shell<C: Codec>(player: Arc<Player<FsStorage, C>>) -> anyhow::Result<()> {
    let mut events = player.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} player events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("Type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        debug!("Shell command: {:?}", command);

        let worker = Arc::clone(&player);
        match tokio::task::spawn_blocking(move || execute(&worker, command)).await? {
            Ok(Reply::Text(text)) if text.is_empty() => {}
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Exit) => break,
            Err(e) => println!("{}", e),
        }
    }

    let worker = Arc::clone(&player);
    tokio::task::spawn_blocking(move || worker.stop()).await?;
    printer.abort();
    Ok(())
}
