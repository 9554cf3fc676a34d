//! WAV fixture generation
//!
//! Well-formed files are written with hound. Layouts hound will not produce
//! (extra chunks, extended `fmt `, bogus fields) come from [`RiffBuilder`].

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Write a mono 8-bit unsigned PCM file holding exactly `samples`
pub fn write_pcm8<P: AsRef<Path>>(path: P, sample_rate: u32, samples: &[u8]) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 8,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        // hound stores 8-bit samples offset by 128
        writer.write_sample((i16::from(sample) - 128) as i8)?;
    }
    writer.finalize()
}

/// Write a mono 16-bit signed PCM file holding exactly `samples`
pub fn write_pcm16<P: AsRef<Path>>(path: P, sample_rate: u32, samples: &[i16]) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// `len` distinct-looking 8-bit samples
pub fn ramp8(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Byte-level RIFF/WAVE writer
pub struct RiffBuilder {
    body: Vec<u8>,
}

impl RiffBuilder {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    /// Append an arbitrary chunk
    pub fn chunk(mut self, id: &[u8; 4], payload: &[u8]) -> Self {
        self.body.extend_from_slice(id);
        self.body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.body.extend_from_slice(payload);
        self
    }

    /// Append a `fmt ` chunk with `extra` trailing bytes after the 16-byte body
    pub fn fmt(self, format_tag: u16, channels: u16, sample_rate: u32, bits: u16, extra: usize) -> Self {
        let block_align = channels * (bits / 8).max(1);
        let mut payload = Vec::new();
        payload.extend_from_slice(&format_tag.to_le_bytes());
        payload.extend_from_slice(&channels.to_le_bytes());
        payload.extend_from_slice(&sample_rate.to_le_bytes());
        payload.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
        payload.extend_from_slice(&block_align.to_le_bytes());
        payload.extend_from_slice(&bits.to_le_bytes());
        payload.extend(std::iter::repeat(0u8).take(extra));
        self.chunk(b"fmt ", &payload)
    }

    pub fn data(self, samples: &[u8]) -> Self {
        self.chunk(b"data", samples)
    }

    pub fn build(self) -> Vec<u8> {
        let mut file = Vec::with_capacity(self.body.len() + 12);
        file.extend_from_slice(b"RIFF");
        file.extend_from_slice(&(self.body.len() as u32 + 4).to_le_bytes());
        file.extend_from_slice(b"WAVE");
        file.extend_from_slice(&self.body);
        file
    }

    pub fn write<P: AsRef<Path>>(self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }
}

impl Default for RiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}
