//! # WDP Common Library
//!
//! Shared code for the WAV DAC player crates:
//! - Error type shared by configuration loading
//! - Configuration file location and root folder (mounted volume) resolution
//! - Player state and event types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{PlayerEvent, PlayerState, SessionOutcome};
