//! Transfer buffer shared between the streaming task and the codec
//!
//! The buffer is split into two equal halves. At any instant the codec owns
//! one half (converting it) and the streaming task owns the other (refilling
//! it). Ownership is tracked explicitly by [`HalfOwnership`] and flips once
//! per transfer-complete notification.
//!
//! Bytes are stored as atomics so the codec side can read without locks;
//! the ownership alternation keeps the two sides on different halves.

use crate::wave::BitDepth;
use std::ops::Range;
use std::sync::atomic::{AtomicU8, Ordering};

/// Default transfer buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Offset added to signed 16-bit samples to produce offset-binary
const CENTER_OFFSET: u16 = 0x8000;

/// One of the two buffer partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    A,
    B,
}

impl Half {
    pub fn other(self) -> Half {
        match self {
            Half::A => Half::B,
            Half::B => Half::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Half::A => 0,
            Half::B => 1,
        }
    }
}

/// Which half the codec is converting; the software half is its complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfOwnership {
    hardware: Half,
}

impl HalfOwnership {
    /// Conversion always starts at half A
    pub fn new() -> Self {
        Self { hardware: Half::A }
    }

    pub fn hardware(&self) -> Half {
        self.hardware
    }

    pub fn software(&self) -> Half {
        self.hardware.other()
    }

    /// Record one transfer-complete: the codec moves on to the other half.
    ///
    /// Returns the half just released to software.
    pub fn advance(&mut self) -> Half {
        let released = self.hardware;
        self.hardware = released.other();
        released
    }
}

impl Default for HalfOwnership {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-size byte region armed for circular conversion
pub struct TransferBuffer {
    bytes: Box<[AtomicU8]>,
}

impl TransferBuffer {
    /// Allocate a zeroed buffer of `len` bytes.
    ///
    /// # Panics
    /// Panics if `len` is zero or not a multiple of 4 (each half must hold
    /// whole 16-bit samples).
    pub fn new(len: usize) -> Self {
        assert!(len > 0 && len % 4 == 0, "transfer buffer size must be a non-zero multiple of 4");
        Self {
            bytes: (0..len).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn half_len(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn half_range(&self, half: Half) -> Range<usize> {
        let start = half.index() * self.half_len();
        start..start + self.half_len()
    }

    /// Number of samples the buffer holds at `depth`
    pub fn len_in_samples(&self, depth: BitDepth) -> usize {
        self.len() / depth.bytes_per_sample()
    }

    /// Copy `data` into the buffer starting at byte `offset`
    pub fn write(&self, offset: usize, data: &[u8]) {
        for (slot, &byte) in self.bytes[offset..offset + data.len()].iter().zip(data) {
            slot.store(byte, Ordering::Relaxed);
        }
    }

    /// Offset-binary value of sample `index` as the codec sees it
    pub fn sample(&self, index: usize, depth: BitDepth) -> u16 {
        match depth {
            BitDepth::Eight => u16::from(self.bytes[index].load(Ordering::Relaxed)),
            BitDepth::Sixteen => {
                let lo = self.bytes[index * 2].load(Ordering::Relaxed);
                let hi = self.bytes[index * 2 + 1].load(Ordering::Relaxed);
                u16::from_le_bytes([lo, hi])
            }
        }
    }

    /// Copy of one half's bytes
    pub fn snapshot(&self, half: Half) -> Vec<u8> {
        self.bytes[self.half_range(half)]
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }
}

/// Convert signed little-endian 16-bit samples to offset-binary in place.
///
/// Adds 0x8000 to every sample with wraparound. A trailing odd byte is left
/// untouched.
pub fn center_samples(bytes: &mut [u8]) {
    for sample in bytes.chunks_exact_mut(2) {
        let centered = u16::from_le_bytes([sample[0], sample[1]]).wrapping_add(CENTER_OFFSET);
        sample.copy_from_slice(&centered.to_le_bytes());
    }
}
