//! Directory listing backends
//!
//! Workers never call `std::fs` directly; they go through a `DirSource`.
//! `LocalFs` is the production backend. Tests wrap it to inject latency
//! or failures on chosen paths.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// A raw entry returned by a directory listing
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Entry name (not full path)
    pub name: OsString,

    /// True if the listing reports a directory (symlinks are not followed)
    pub is_dir: bool,
}

impl RawEntry {
    /// Check if the entry name starts with the hidden-file marker
    pub fn is_hidden(&self) -> bool {
        self.name.as_encoded_bytes().first() == Some(&b'.')
    }
}

/// Metadata needed to build a node
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryMeta {
    /// Size in bytes
    pub len: u64,

    /// True for directories
    pub is_dir: bool,

    /// Modification time (Unix timestamp)
    pub mtime: Option<i64>,
}

impl EntryMeta {
    /// Build from std metadata
    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        Self {
            len: meta.len(),
            is_dir: meta.is_dir(),
            mtime: meta.modified().ok().map(unix_seconds),
        }
    }
}

/// Convert a SystemTime to a Unix timestamp, negative before the epoch
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Backend that lists directories and reads entry metadata
pub trait DirSource: Send + Sync {
    /// List the immediate entries of `path`, in backend order
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>>;

    /// Metadata for `path` without following a final symlink
    fn metadata(&self, path: &Path) -> io::Result<EntryMeta>;

    /// Metadata for the walk root, following a final symlink
    fn root_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        self.metadata(path)
    }
}

/// Local filesystem backend
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl DirSource for LocalFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<RawEntry>> {
        fs::read_dir(path)?
            .map(|entry| {
                let entry = entry?;
                let is_dir = entry.file_type()?.is_dir();
                Ok(RawEntry {
                    name: entry.file_name(),
                    is_dir,
                })
            })
            .collect()
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        fs::symlink_metadata(path).map(|m| EntryMeta::from_metadata(&m))
    }

    fn root_metadata(&self, path: &Path) -> io::Result<EntryMeta> {
        fs::metadata(path).map(|m| EntryMeta::from_metadata(&m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_hidden_marker() {
        let hidden = RawEntry {
            name: ".git".into(),
            is_dir: true,
        };
        let visible = RawEntry {
            name: "src".into(),
            is_dir: true,
        };
        assert!(hidden.is_hidden());
        assert!(!visible.is_hidden());
    }

    #[test]
    fn test_unix_seconds() {
        assert_eq!(unix_seconds(UNIX_EPOCH + Duration::from_secs(42)), 42);
        assert_eq!(unix_seconds(UNIX_EPOCH - Duration::from_secs(7)), -7);
    }

    #[test]
    fn test_local_fs_listing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut entries = LocalFs.read_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert!(!entries[0].is_dir);
        assert!(entries[1].is_dir);

        let meta = LocalFs.metadata(&dir.path().join("a.txt")).unwrap();
        assert_eq!(meta.len, 10);
        assert!(!meta.is_dir);
        assert!(meta.mtime.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_root_metadata_follows_symlink() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path().join("real"), &link).unwrap();

        assert!(!LocalFs.metadata(&link).unwrap().is_dir);
        assert!(LocalFs.root_metadata(&link).unwrap().is_dir);
    }

    #[test]
    fn test_local_fs_missing_dir() {
        let dir = tempdir().unwrap();
        let err = LocalFs.read_dir(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
