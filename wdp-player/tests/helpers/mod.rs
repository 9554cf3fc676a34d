//! Test helpers for wdp-player integration tests
//!
//! - WAV fixture writers (hound) and a raw RIFF chunk builder
//! - CountingStorage: filesystem storage that tracks open file handles
//! - FaultyStorage: counted storage whose reads fail past a byte offset

#![allow(dead_code)]

pub mod counting_storage;
pub mod error_injection;
pub mod wav_fixtures;

pub use counting_storage::{CountingStorage, OpenFiles};
pub use error_injection::{FaultyStorage, INJECTED_READ_ERROR};
pub use wav_fixtures::{write_pcm16, write_pcm8, ramp8, RiffBuilder};
