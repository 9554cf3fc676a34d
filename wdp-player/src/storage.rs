//! Storage collaborator
//!
//! Byte-range access to files on the mounted volume. Dropping a handle
//! closes the file.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Random-access byte reads over named paths on a mounted volume
pub trait Storage: Send + Sync + 'static {
    type File: Read + Seek + Send + 'static;

    /// Open `path` for reading, positioned at offset 0
    fn open(&self, path: &Path) -> io::Result<Self::File>;
}

/// Storage backed by a directory of the host filesystem
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative paths resolve against the root folder; absolute paths are kept
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Every regular file below the root folder, relative to it, sorted.
    ///
    /// Hidden entries (dot-prefixed) are skipped along with anything below
    /// them. Unreadable entries are logged and skipped.
    pub fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Root folder is not a directory: {}", self.root.display()),
            ));
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                        files.push(relative.to_path_buf());
                    }
                }
                Err(e) => warn!("Skipping unreadable entry: {}", e),
            }
        }

        files.sort();
        Ok(files)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

impl Storage for FsStorage {
    type File = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(self.resolve(path))
    }
}

/// Read until `buf` is full or the reader reaches end of file.
///
/// Returns the number of bytes transferred; less than `buf.len()` only at
/// end of file.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader handing out at most 3 bytes per call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(3);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_read_full_accumulates_short_reads() {
        let mut reader = Trickle(Cursor::new((0u8..10).collect()));
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 8);
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_read_full_short_at_eof() {
        let mut reader = Trickle(Cursor::new(vec![9u8; 5]));
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 5);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_fs_storage_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.wav"), b"abc").unwrap();
        std::fs::write(dir.path().join("b.wav"), b"def").unwrap();

        let storage = FsStorage::new(dir.path());
        let mut file = storage.open(Path::new("sub/a.wav")).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "abc");

        let files = storage.list_files().unwrap();
        assert_eq!(files, vec![PathBuf::from("b.wav"), PathBuf::from("sub/a.wav")]);
    }

    #[test]
    fn test_list_files_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".trash/deep")).unwrap();
        std::fs::create_dir_all(dir.path().join("music/empty")).unwrap();
        std::fs::write(dir.path().join(".trash/deep/old.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("music/.DS_Store"), b"x").unwrap();
        std::fs::write(dir.path().join("music/song.wav"), b"x").unwrap();

        let files = FsStorage::new(dir.path()).list_files().unwrap();
        assert_eq!(files, vec![PathBuf::from("music/song.wav")]);
    }

    #[test]
    fn test_list_files_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path().join("absent"));
        assert_eq!(storage.list_files().unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
