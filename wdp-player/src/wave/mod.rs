//! RIFF/WAVE container support

pub mod format;
pub mod parser;

pub use format::{BitDepth, StreamFormat, MAX_SAMPLE_RATE_HZ};
pub use parser::{parse_header, parse_header_with_limit, ChunkHeader, WaveHeader, DEFAULT_HEADER_SCAN_LIMIT};
