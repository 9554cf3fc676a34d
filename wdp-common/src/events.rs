//! Player state and event types

use std::fmt;

/// Playback controller state.
///
/// `Opening` and `Parsing` are transient states held while `play()` runs;
/// a session's terminal outcome is reported separately as [`SessionOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Opening,
    Parsing,
    Streaming,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerState::Idle => "idle",
            PlayerState::Opening => "opening",
            PlayerState::Parsing => "parsing",
            PlayerState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

/// How a streaming session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every sample of the data chunk was converted
    Completed,
    /// Ended by a stop request (explicit `stop()` or a newer `play()`)
    Stopped,
    /// Ended by a storage read error or a hardware transfer error
    Failed { reason: String },
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed => f.write_str("completed"),
            SessionOutcome::Stopped => f.write_str("stopped"),
            SessionOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Player event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A streaming task was launched for `path`
    SessionStarted {
        path: String,
        sample_rate_hz: u32,
        bits_per_sample: u16,
        data_bytes: u32,
    },

    /// The streaming task for `path` exited
    SessionFinished {
        path: String,
        outcome: SessionOutcome,
    },
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerEvent::SessionStarted {
                path,
                sample_rate_hz,
                bits_per_sample,
                data_bytes,
            } => write!(
                f,
                "playing {} ({} Hz, {} bit, {} bytes)",
                path, sample_rate_hz, bits_per_sample, data_bytes
            ),
            PlayerEvent::SessionFinished { path, outcome } => write!(f, "{} {}", path, outcome),
        }
    }
}
