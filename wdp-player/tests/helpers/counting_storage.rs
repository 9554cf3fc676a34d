//! Storage wrapper that counts open file handles

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wdp_player::storage::{FsStorage, Storage};

/// Handle counters shared between a [`CountingStorage`] and the test
#[derive(Debug, Default)]
pub struct OpenFiles {
    opened: AtomicUsize,
    current: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl OpenFiles {
    /// Total successful opens
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Handles open right now
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Most handles ever open at the same time
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

pub struct CountingStorage {
    inner: FsStorage,
    files: Arc<OpenFiles>,
}

impl CountingStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: FsStorage::new(root),
            files: Arc::new(OpenFiles::default()),
        }
    }

    pub fn counters(&self) -> Arc<OpenFiles> {
        Arc::clone(&self.files)
    }
}

impl Storage for CountingStorage {
    type File = CountedFile;

    fn open(&self, path: &Path) -> io::Result<CountedFile> {
        let file = self.inner.open(path)?;
        self.files.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.files.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.files.max_concurrent.fetch_max(now, Ordering::SeqCst);
        Ok(CountedFile {
            file,
            files: Arc::clone(&self.files),
        })
    }
}

pub struct CountedFile {
    file: File,
    files: Arc<OpenFiles>,
}

impl Read for CountedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for CountedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Drop for CountedFile {
    fn drop(&mut self) {
        self.files.current.fetch_sub(1, Ordering::SeqCst);
    }
}
