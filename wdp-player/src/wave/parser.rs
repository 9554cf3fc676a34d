//! RIFF/WAVE header parser
//!
//! Locates the `fmt ` and `data` chunks of a WAVE file, skipping any other
//! chunks in between, and validates that the stream is playable.
//!
//! Chunk skips advance by exactly the declared size. Word-alignment padding
//! after odd-sized chunks is not applied.

use crate::error::{Error, Result};
use crate::storage::read_full;
use crate::wave::format::StreamFormat;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Default ceiling on the offset at which a chunk header may start
pub const DEFAULT_HEADER_SCAN_LIMIT: u64 = 4096;

const RIFF_TAG: [u8; 4] = *b"RIFF";
const WAVE_TAG: [u8; 4] = *b"WAVE";
const FMT_TAG: [u8; 4] = *b"fmt ";
const DATA_TAG: [u8; 4] = *b"data";

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: u64 = 8;
const FMT_BODY_LEN: usize = 16;
const FORMAT_PCM: u16 = 1;

/// Tag and length of one chunk, plus where its payload starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: [u8; 4],
    pub size: u32,
    pub offset_following: u64,
}

impl ChunkHeader {
    /// Read the header at the current position. `None` at end of file.
    fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Option<Self>> {
        let mut raw = [0u8; CHUNK_HEADER_LEN as usize];
        if read_full(reader, &mut raw).map_err(Error::FileReadError)? < raw.len() {
            return Ok(None);
        }
        let offset_following = reader.stream_position().map_err(Error::FileReadError)?;

        Ok(Some(Self {
            id: [raw[0], raw[1], raw[2], raw[3]],
            size: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            offset_following,
        }))
    }

    /// Tag as text, for diagnostics
    pub fn tag(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }

    fn next_offset(&self) -> u64 {
        self.offset_following + u64::from(self.size)
    }
}

/// Result of a successful header parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveHeader {
    pub format: StreamFormat,
    /// Declared length of the `data` chunk in bytes
    pub data_len: u32,
    /// File offset of the first sample byte
    pub data_offset: u64,
}

/// Parse with [`DEFAULT_HEADER_SCAN_LIMIT`]
pub fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<WaveHeader> {
    parse_header_with_limit(reader, DEFAULT_HEADER_SCAN_LIMIT)
}

/// Parse the header of a WAVE file.
///
/// On success the reader is left positioned at `data_offset`.
///
/// # Errors
/// - `NotAWaveFile`: bad RIFF/WAVE tags, missing or short `fmt ` chunk, non-PCM
/// - `UnsupportedChannelLayout` / `UnsupportedBitDepth` / `UnsupportedSampleRate`
/// - `DataChunkNotFound`: no `data` chunk header starts below `scan_limit`
/// - `FileReadError`: storage failure
pub fn parse_header_with_limit<R: Read + Seek>(reader: &mut R, scan_limit: u64) -> Result<WaveHeader> {
    reader.seek(SeekFrom::Start(0)).map_err(Error::FileReadError)?;

    let mut riff = [0u8; RIFF_HEADER_LEN];
    if read_full(reader, &mut riff).map_err(Error::FileReadError)? < RIFF_HEADER_LEN {
        return Err(Error::NotAWaveFile("file too short for a RIFF header".to_string()));
    }
    if riff[0..4] != RIFF_TAG {
        return Err(Error::NotAWaveFile("missing RIFF tag".to_string()));
    }
    if riff[8..12] != WAVE_TAG {
        return Err(Error::NotAWaveFile("RIFF type is not WAVE".to_string()));
    }

    let fmt = find_chunk(reader, FMT_TAG, scan_limit)?
        .ok_or_else(|| Error::NotAWaveFile("fmt chunk not found".to_string()))?;
    let format = read_format(reader, &fmt)?;

    // Skips the extension field when the fmt chunk is longer than 16 bytes
    reader
        .seek(SeekFrom::Start(fmt.next_offset()))
        .map_err(Error::FileReadError)?;

    let data = find_chunk(reader, DATA_TAG, scan_limit)?.ok_or(Error::DataChunkNotFound)?;

    debug!(
        "WAVE header: {} Hz, {} bit, {} data bytes at offset {}",
        format.sample_rate_hz(),
        format.bits_per_sample(),
        data.size,
        data.offset_following
    );

    Ok(WaveHeader {
        format,
        data_len: data.size,
        data_offset: data.offset_following,
    })
}

fn read_format<R: Read + Seek>(reader: &mut R, fmt: &ChunkHeader) -> Result<StreamFormat> {
    if (fmt.size as usize) < FMT_BODY_LEN {
        return Err(Error::NotAWaveFile(format!("fmt chunk too short ({} bytes)", fmt.size)));
    }

    let mut body = [0u8; FMT_BODY_LEN];
    if read_full(reader, &mut body).map_err(Error::FileReadError)? < FMT_BODY_LEN {
        return Err(Error::NotAWaveFile("fmt chunk truncated".to_string()));
    }

    let audio_format = u16::from_le_bytes([body[0], body[1]]);
    let channels = u16::from_le_bytes([body[2], body[3]]);
    let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
    let byte_rate = u32::from_le_bytes([body[8], body[9], body[10], body[11]]);
    let block_align = u16::from_le_bytes([body[12], body[13]]);
    let bits_per_sample = u16::from_le_bytes([body[14], body[15]]);

    debug!(
        "fmt: format={} channels={} rate={} byte_rate={} block_align={} bits={}",
        audio_format, channels, sample_rate, byte_rate, block_align, bits_per_sample
    );

    if audio_format != FORMAT_PCM {
        return Err(Error::NotAWaveFile(format!("audio format {} is not PCM", audio_format)));
    }

    StreamFormat::new(channels, sample_rate, bits_per_sample)
}

/// Walk chunk headers from the current position until `wanted` is found.
///
/// Returns `None` at end of file or once the next header would start past
/// `scan_limit`.
fn find_chunk<R: Read + Seek>(reader: &mut R, wanted: [u8; 4], scan_limit: u64) -> Result<Option<ChunkHeader>> {
    loop {
        let position = reader.stream_position().map_err(Error::FileReadError)?;
        if position + CHUNK_HEADER_LEN > scan_limit {
            debug!(
                "Header scan limit {} reached looking for '{}' chunk",
                scan_limit,
                String::from_utf8_lossy(&wanted)
            );
            return Ok(None);
        }

        let Some(header) = ChunkHeader::read_from(reader)? else {
            return Ok(None);
        };
        if header.id == wanted {
            return Ok(Some(header));
        }

        trace!("Skipping '{}' chunk ({} bytes)", header.tag(), header.size);
        reader
            .seek(SeekFrom::Start(header.next_offset()))
            .map_err(Error::FileReadError)?;
    }
}
