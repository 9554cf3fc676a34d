//! Playback controller and streaming engine

pub mod player;
pub mod session;
pub mod task;

pub use player::{Player, PlayerSettings};
pub use session::{Step, StreamSession};
pub use task::{run_stream_task, TaskExit};
