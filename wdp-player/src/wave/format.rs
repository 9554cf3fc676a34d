//! Stream parameters handed from the parser to the engine and codec

use crate::error::{Error, Result};

/// Highest sample rate the output timer is driven at
pub const MAX_SAMPLE_RATE_HZ: u32 = 44_100;

/// Supported PCM sample widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// Unsigned 8-bit samples, mid-scale 0x80
    Eight,
    /// Signed little-endian 16-bit samples
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
        }
    }

    /// Byte value of a zero-amplitude sample in the file encoding
    pub fn silence_byte(self) -> u8 {
        match self {
            BitDepth::Eight => 0x80,
            BitDepth::Sixteen => 0x00,
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = Error;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            other => Err(Error::UnsupportedBitDepth(other)),
        }
    }
}

/// Validated format of a playable stream. Always mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    sample_rate_hz: u32,
    bit_depth: BitDepth,
}

impl StreamFormat {
    pub const CHANNEL_COUNT: u16 = 1;

    /// Validate raw `fmt ` fields, in the order channels, bit depth, rate
    pub fn new(channels: u16, sample_rate_hz: u32, bits_per_sample: u16) -> Result<Self> {
        if channels != Self::CHANNEL_COUNT {
            return Err(Error::UnsupportedChannelLayout(channels));
        }
        let bit_depth = BitDepth::try_from(bits_per_sample)?;
        if sample_rate_hz == 0 || sample_rate_hz > MAX_SAMPLE_RATE_HZ {
            return Err(Error::UnsupportedSampleRate(sample_rate_hz));
        }
        Ok(Self {
            sample_rate_hz,
            bit_depth,
        })
    }

    pub fn channel_count(&self) -> u16 {
        Self::CHANNEL_COUNT
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bit_depth.bits()
    }
}
