//! Streaming session: the double-buffer refill state machine
//!
//! One session per `play()`. The session owns the open file, the remaining
//! byte count and the half-ownership state. It is driven by the streaming
//! task: [`StreamSession::start`] once, then
//! [`StreamSession::on_transfer_complete`] for every transfer-complete
//! notification.
//!
//! Once the data chunk is exhausted the codec keeps running without further
//! refills until every half still holding audio has been converted.

use crate::audio::buffer::{center_samples, Half, HalfOwnership, TransferBuffer};
use crate::audio::codec::Codec;
use crate::audio::notify::Notifier;
use crate::error::{Error, Result};
use crate::storage::read_full;
use crate::wave::{BitDepth, StreamFormat, WaveHeader};
use std::io::Read;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What the task loop should do after a session step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep waiting for codec notifications
    Continue,
    /// All audio has been converted (or there was none)
    Finished,
}

pub struct StreamSession<F> {
    file: F,
    format: StreamFormat,
    remaining: u32,
    buffer: Arc<TransferBuffer>,
    ownership: HalfOwnership,
    /// Audio bytes loaded into each half and not yet converted
    loaded: [usize; 2],
    exhausted: bool,
    fills: u64,
    scratch: Vec<u8>,
}

impl<F: Read> StreamSession<F> {
    /// `file` must already be positioned at `header.data_offset`
    pub fn new(file: F, header: &WaveHeader, buffer: Arc<TransferBuffer>) -> Self {
        let scratch = vec![0u8; buffer.len()];
        Self {
            file,
            format: header.format,
            remaining: header.data_len,
            buffer,
            ownership: HalfOwnership::new(),
            loaded: [0; 2],
            exhausted: false,
            fills: 0,
            scratch,
        }
    }

    /// Initial fill of the whole buffer, then start circular conversion.
    ///
    /// An empty data chunk finishes immediately without touching the codec.
    pub fn start<C: Codec + ?Sized>(&mut self, codec: &mut C, listener: Arc<Notifier>) -> Result<Step> {
        if self.remaining == 0 {
            debug!("Empty data chunk, nothing to stream");
            self.exhausted = true;
            return Ok(Step::Finished);
        }

        let whole = 0..self.buffer.len();
        let read = self.load(whole)?;
        let half_len = self.buffer.half_len();
        self.loaded = [read.min(half_len), read.saturating_sub(half_len)];
        self.consume(read);

        if read == 0 {
            warn!("File ended before any sample data");
            return Ok(Step::Finished);
        }

        let length_in_samples = self.buffer.len_in_samples(self.format.bit_depth());
        codec.start_streaming(Arc::clone(&self.buffer), length_in_samples, listener)?;

        debug!(
            "Streaming started: {} bytes loaded, {} remaining",
            read, self.remaining
        );
        Ok(Step::Continue)
    }

    /// Handle one transfer-complete: the codec has moved to the other half,
    /// so the half it just released is refilled.
    pub fn on_transfer_complete(&mut self) -> Result<Step> {
        let released = self.ownership.advance();

        let range = self.buffer.half_range(released);
        if self.exhausted {
            // Hardware moves onto this half after the last audio half
            self.silence(range);
            self.loaded[released.index()] = 0;
        } else {
            let read = self.load(range)?;
            self.loaded[released.index()] = read;
            self.consume(read);
            trace!("Refilled half {:?} with {} bytes, {} remaining", released, read, self.remaining);
        }

        if self.exhausted && self.loaded == [0, 0] {
            debug!("All audio converted after {} fills", self.fills);
            return Ok(Step::Finished);
        }
        Ok(Step::Continue)
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn remaining_bytes(&self) -> u32 {
        self.remaining
    }

    /// Half currently being converted by the codec
    pub fn hardware_half(&self) -> Half {
        self.ownership.hardware()
    }

    /// Half currently owned by software
    pub fn software_half(&self) -> Half {
        self.ownership.software()
    }

    /// Storage reads issued into the buffer, initial fill included
    pub fn fills(&self) -> u64 {
        self.fills
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Read up to `range.len()` bytes (capped at the remaining data length),
    /// pad the rest with silence, center 16-bit samples, and publish the
    /// result into `range` of the transfer buffer.
    fn load(&mut self, range: Range<usize>) -> Result<usize> {
        let depth = self.format.bit_depth();
        let want = range.len().min(self.remaining as usize);
        let scratch = &mut self.scratch[..range.len()];

        let read = read_full(&mut self.file, &mut scratch[..want]).map_err(Error::FileReadError)?;
        self.fills += 1;

        scratch[read..].fill(depth.silence_byte());
        if depth == BitDepth::Sixteen {
            center_samples(scratch);
        }
        self.buffer.write(range.start, scratch);

        Ok(read)
    }

    /// Overwrite `range` with silence without touching storage
    fn silence(&mut self, range: Range<usize>) {
        let depth = self.format.bit_depth();
        let scratch = &mut self.scratch[..range.len()];
        scratch.fill(depth.silence_byte());
        if depth == BitDepth::Sixteen {
            center_samples(scratch);
        }
        self.buffer.write(range.start, scratch);
    }

    fn consume(&mut self, read: usize) {
        // read never exceeds remaining, see load()
        self.remaining -= read as u32;
        if self.remaining == 0 {
            self.exhausted = true;
        } else if read == 0 {
            warn!("File ended {} bytes before the declared data length", self.remaining);
            self.exhausted = true;
        }
    }
}
