//! # Storage Backends
//!
//! Key/value persistence underneath the state store. The store keeps the
//! whole voting state in one record and a schema version marker in another.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::checksum::{frame, unframe};
use super::errors::{StoreError, StoreResult};

/// Record holding the serialized state blob
pub const STATE_KEY: &str = "livevote:state";

/// Record holding the schema version marker
pub const VERSION_KEY: &str = "livevote:version";

/// Backend trait for state persistence
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Durably store `value` under `key`
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key`; absent keys are not an error
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// In-process backend; contents die with the process
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::unavailable("Lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::unavailable("Lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::unavailable("Lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// One checksummed file per key under a data directory.
///
/// Writes go to a temporary file which is fsynced and then renamed over the
/// previous record, so a crash leaves either the old or the new value.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if missing) the data directory
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            StoreError::unavailable(format!(
                "Failed to create data directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Data directory root
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.rec", file_name))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => unframe(&bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::unavailable(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("rec.tmp");

        let mut file = File::create(&tmp)?;
        file.write_all(&frame(value))?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get(STATE_KEY).unwrap(), None);

        backend.put(STATE_KEY, b"blob").unwrap();
        assert_eq!(backend.get(STATE_KEY).unwrap(), Some(b"blob".to_vec()));

        backend.delete(STATE_KEY).unwrap();
        assert_eq!(backend.get(STATE_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_backend_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let backend = FileBackend::open(dir.path()).unwrap();
            backend.put(VERSION_KEY, b"3").unwrap();
        }
        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(backend.get(VERSION_KEY).unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_file_backend_detects_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.put(STATE_KEY, b"{\"artists\":[]}").unwrap();

        let path = backend.path_for(STATE_KEY);
        let mut bytes = fs::read(&path).unwrap();
        bytes[5] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(backend.get(STATE_KEY), Err(StoreError::Corrupted(_))));
    }

    #[test]
    fn test_file_backend_delete_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert!(backend.delete("missing").is_ok());
    }

    #[test]
    fn test_key_maps_to_safe_file_name() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let path = backend.path_for(STATE_KEY);
        assert_eq!(path.file_name().unwrap(), "livevote_state.rec");
    }
}
