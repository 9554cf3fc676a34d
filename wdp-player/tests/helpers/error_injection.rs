//! Storage fault injection
//!
//! `FaultyStorage` opens files through a [`CountingStorage`] and makes every
//! read at or past a byte offset fail, as if the card were pulled mid-stream.

use super::counting_storage::{CountedFile, CountingStorage, OpenFiles};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wdp_player::storage::Storage;

/// Message carried by injected read errors
pub const INJECTED_READ_ERROR: &str = "sd card gone";

pub struct FaultyStorage {
    inner: CountingStorage,
    fail_at: u64,
}

impl FaultyStorage {
    /// Reads succeed for the first `fail_at` bytes of each file
    pub fn new(root: impl Into<PathBuf>, fail_at: u64) -> Self {
        Self {
            inner: CountingStorage::new(root),
            fail_at,
        }
    }

    pub fn counters(&self) -> Arc<OpenFiles> {
        self.inner.counters()
    }
}

impl Storage for FaultyStorage {
    type File = FaultyFile;

    fn open(&self, path: &Path) -> io::Result<FaultyFile> {
        Ok(FaultyFile {
            file: self.inner.open(path)?,
            position: 0,
            fail_at: self.fail_at,
        })
    }
}

pub struct FaultyFile {
    file: CountedFile,
    position: u64,
    fail_at: u64,
}

impl Read for FaultyFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let left = self.fail_at.saturating_sub(self.position);
        if left == 0 && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Other, INJECTED_READ_ERROR));
        }
        let len = buf.len().min(left as usize);
        let read = self.file.read(&mut buf[..len])?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for FaultyFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.file.seek(pos)?;
        Ok(self.position)
    }
}
