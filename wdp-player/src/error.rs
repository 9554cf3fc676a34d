//! Error types for wdp-player
//!
//! Parse-time errors are returned from `Player::play`; runtime errors end the
//! streaming session and only surface as its outcome.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for wdp-player
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened on the mounted volume
    #[error("Failed to open file {}: {source}", path.display())]
    FileOpenError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A storage read or seek failed
    #[error("File read error: {0}")]
    FileReadError(#[source] io::Error),

    /// Not a RIFF/WAVE container holding PCM audio
    #[error("Not a PCM WAVE file: {0}")]
    NotAWaveFile(String),

    /// Channel count other than 1
    #[error("Only mono audio supported, file has {0} channels")]
    UnsupportedChannelLayout(u16),

    /// Bit depth other than 8 or 16
    #[error("{0} bits per sample not supported")]
    UnsupportedBitDepth(u16),

    /// Sample rate above 44100 Hz (or zero)
    #[error("Sample rate {0} Hz not supported")]
    UnsupportedSampleRate(u32),

    /// No `data` chunk within the header scan limit
    #[error("Data chunk not found")]
    DataChunkNotFound,

    /// The codec reported a transfer fault (e.g. DMA underrun)
    #[error("Hardware transfer error")]
    HardwareTransferError,

    /// The session was stopped on request
    #[error("Playback cancelled")]
    Cancelled,

    /// Output device could not be configured or started
    #[error("Audio output error: {0}")]
    Codec(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shell command rejected
    #[error("{0}")]
    InvalidCommand(String),

    /// Shared configuration loading errors
    #[error(transparent)]
    Common(#[from] wdp_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using wdp-player Error
pub type Result<T> = std::result::Result<T, Error>;
