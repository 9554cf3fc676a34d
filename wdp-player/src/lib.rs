//! # WAV DAC Player Library (wdp-player)
//!
//! Streams mono PCM WAV files from a mounted volume to a DAC-style output
//! through a double-buffered transfer buffer.
//!
//! **Architecture:** RIFF/WAVE header parser → streaming task refilling one
//! half of the transfer buffer while the codec converts the other half →
//! playback controller owning the task lifecycle.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod shell;
pub mod state;
pub mod storage;
pub mod wave;

pub use error::{Error, Result};
pub use playback::Player;
pub use state::SharedState;
