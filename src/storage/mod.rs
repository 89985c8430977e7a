//! Storage layer for mediasift
//!
//! Owns the two durable files of an index: the snapshot (every path → vector
//! pair plus the last update time) and the progress record of an unfinished
//! indexing run.

pub mod progress;
pub mod snapshot;

use crate::error::{MediaSiftError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use std::fs;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use progress::ProgressRecord;
pub use snapshot::{IndexEntry, IndexSnapshot, SnapshotError, SnapshotHeader};

/// Default snapshot file name inside the data directory
pub const DEFAULT_SNAPSHOT_FILE: &str = "image_index.bin";
/// Default progress file name inside the data directory
pub const DEFAULT_PROGRESS_FILE: &str = "indexing_progress.json";

/// Snapshot shared between the indexer (writer) and searchers (readers).
///
/// Entries are inserted whole under the write lock, so readers may see a
/// partially updated index but never a partially written vector.
pub type SharedSnapshot = Arc<RwLock<IndexSnapshot>>;

pub fn shared(snapshot: IndexSnapshot) -> SharedSnapshot {
    Arc::new(RwLock::new(snapshot))
}

/// Read access; a panic in another holder does not invalidate whole entries
pub fn read_snapshot(snapshot: &SharedSnapshot) -> RwLockReadGuard<'_, IndexSnapshot> {
    snapshot.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_snapshot(snapshot: &SharedSnapshot) -> RwLockWriteGuard<'_, IndexSnapshot> {
    snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Durable home of the index
#[derive(Debug, Clone)]
pub struct IndexStore {
    snapshot_path: PathBuf,
    progress_path: PathBuf,
}

impl IndexStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed
    pub fn new(data_dir: &Path, snapshot_file: &str, progress_file: &str) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|e| {
            MediaSiftError::io(
                e,
                format!("Failed to create data directory: {}", data_dir.display()),
            )
        })?;

        Ok(Self::from_paths(
            data_dir.join(snapshot_file),
            data_dir.join(progress_file),
        ))
    }

    /// Use explicit file locations
    pub fn from_paths(snapshot_path: PathBuf, progress_path: PathBuf) -> Self {
        Self {
            snapshot_path,
            progress_path,
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    /// Load the snapshot, falling back to an empty one.
    ///
    /// A missing file means a first run. An unreadable or corrupt file is
    /// logged and discarded so the engine always starts.
    pub fn load(&self) -> IndexSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    "Loaded index with {} entries from {}",
                    snapshot.len(),
                    self.snapshot_path.display()
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!(
                    "No index at {}, starting empty",
                    self.snapshot_path.display()
                );
                IndexSnapshot::new()
            }
            Err(e) => {
                tracing::error!(
                    "Discarding unreadable index {}: {}",
                    self.snapshot_path.display(),
                    e
                );
                IndexSnapshot::new()
            }
        }
    }

    /// Strict variant of [`load`](Self::load); `Ok(None)` when no file exists
    pub fn try_load(&self) -> Result<Option<IndexSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.snapshot_path).map_err(|e| {
            MediaSiftError::io(
                e,
                format!("Failed to read index: {}", self.snapshot_path.display()),
            )
        })?;

        IndexSnapshot::decode(&bytes)
            .map(Some)
            .map_err(|source| MediaSiftError::CorruptIndex {
                path: self.snapshot_path.clone(),
                source,
            })
    }

    /// Header of the persisted snapshot, without decoding any vectors
    pub fn header(&self) -> Option<SnapshotHeader> {
        let file = fs::File::open(&self.snapshot_path).ok()?;
        match snapshot::read_header(BufReader::new(file)) {
            Ok(header) => Some(header),
            Err(e) => {
                tracing::debug!(
                    "Unreadable index header {}: {}",
                    self.snapshot_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Health probe: a readable snapshot with at least one entry exists
    pub fn exists_and_nonempty(&self) -> bool {
        self.header().map(|h| h.entries > 0).unwrap_or(false)
    }

    /// Time of the last successful persist, `None` meaning "never"
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.header().and_then(|h| h.last_updated)
    }

    /// Write the whole snapshot, stamping it with the current time
    pub fn persist(&self, snapshot: &mut IndexSnapshot) -> Result<()> {
        // The file keeps millisecond precision
        snapshot.set_last_updated(Utc::now().trunc_subsecs(3));
        let bytes = snapshot
            .encode()
            .map_err(|e| MediaSiftError::persistence(&self.snapshot_path, e))?;

        write_atomic(&self.snapshot_path, &bytes)?;

        tracing::debug!(
            "Persisted {} entries ({} bytes) to {}",
            snapshot.len(),
            bytes.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }

    /// Persist a snapshot that searchers may be reading concurrently.
    ///
    /// The write lock is only held to stamp the update time; encoding runs
    /// under a read lock so queries keep flowing.
    pub fn persist_shared(&self, snapshot: &SharedSnapshot) -> Result<()> {
        write_snapshot(snapshot).set_last_updated(Utc::now().trunc_subsecs(3));

        let (bytes, len) = {
            let guard = read_snapshot(snapshot);
            let bytes = guard
                .encode()
                .map_err(|e| MediaSiftError::persistence(&self.snapshot_path, e))?;
            (bytes, guard.len())
        };

        write_atomic(&self.snapshot_path, &bytes)?;

        tracing::debug!(
            "Persisted {} entries ({} bytes) to {}",
            len,
            bytes.len(),
            self.snapshot_path.display()
        );
        Ok(())
    }

    pub fn save_progress(&self, processed: usize, total: usize) -> Result<()> {
        let record = ProgressRecord::new(processed, total);
        let content = serde_json::to_string_pretty(&record).map_err(|e| MediaSiftError::Json {
            source: e,
            context: "Failed to serialize progress record".to_string(),
        })?;

        write_atomic(&self.progress_path, content.as_bytes())
    }

    /// Progress of an unfinished run; a corrupt record is treated as absent
    pub fn load_progress(&self) -> Option<ProgressRecord> {
        let content = fs::read_to_string(&self.progress_path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed progress record {}: {}",
                    self.progress_path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn clear_progress(&self) -> Result<()> {
        match fs::remove_file(&self.progress_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaSiftError::persistence(&self.progress_path, e)),
        }
    }
}

/// Write to a temporary sibling, sync, then rename over the target
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| MediaSiftError::persistence(path, e))?;

    let mut staged =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| MediaSiftError::persistence(path, e))?;
    staged
        .write_all(bytes)
        .map_err(|e| MediaSiftError::persistence(path, e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| MediaSiftError::persistence(path, e))?;
    staged
        .persist(path)
        .map_err(|e| MediaSiftError::persistence(path, e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> IndexStore {
        IndexStore::new(temp.path(), DEFAULT_SNAPSHOT_FILE, DEFAULT_PROGRESS_FILE).unwrap()
    }

    fn one_entry() -> IndexSnapshot {
        let mut snapshot = IndexSnapshot::new();
        snapshot
            .insert(IndexEntry {
                path: "photos/a.jpg".to_string(),
                vector: vec![0.6, 0.8],
                modified: Some(1_700_000_000),
            })
            .unwrap();
        snapshot
    }

    #[test]
    fn test_missing_index_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        assert!(store.load().is_empty());
        assert!(!store.exists_and_nonempty());
        assert_eq!(store.last_update_time(), None);
    }

    #[test]
    fn test_persist_and_load() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let mut snapshot = one_entry();
        store.persist(&mut snapshot).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, snapshot);
        assert!(store.exists_and_nonempty());
        assert_eq!(store.last_update_time(), snapshot.last_updated());
    }

    #[test]
    fn test_persist_shared_stamps_shared_snapshot() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let snapshot = shared(one_entry());

        store.persist_shared(&snapshot).unwrap();

        let stamped = read_snapshot(&snapshot).last_updated();
        assert!(stamped.is_some());
        assert_eq!(store.last_update_time(), stamped);
        assert_eq!(store.load(), *read_snapshot(&snapshot));
    }

    #[test]
    fn test_persisted_empty_index_is_not_nonempty() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.persist(&mut IndexSnapshot::new()).unwrap();

        assert!(store.snapshot_path().exists());
        assert!(!store.exists_and_nonempty());
        assert!(store.last_update_time().is_some());
    }

    #[test]
    fn test_corrupt_index_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.snapshot_path(), b"\x00\x01garbage\xff\xfe").unwrap();

        assert!(store.try_load().is_err());
        assert!(store.load().is_empty());
        assert!(!store.exists_and_nonempty());
    }

    #[test]
    fn test_progress_lifecycle() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        assert!(store.load_progress().is_none());

        store.save_progress(100, 340).unwrap();
        let record = store.load_progress().unwrap();
        assert_eq!(record.processed_files, 100);
        assert_eq!(record.total_files, 340);

        store.clear_progress().unwrap();
        assert!(store.load_progress().is_none());
        assert!(!store.progress_path().exists());

        // Clearing twice is fine
        store.clear_progress().unwrap();
    }

    #[test]
    fn test_malformed_progress_is_ignored() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.progress_path(), "{not json").unwrap();
        assert!(store.load_progress().is_none());
    }

    #[test]
    fn test_persist_over_blocked_path_fails() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::create_dir(store.snapshot_path()).unwrap();
        fs::write(store.snapshot_path().join("keep"), b"x").unwrap();

        let result = store.persist(&mut one_entry());
        assert!(matches!(result, Err(MediaSiftError::Persistence { .. })));

        let result = store.persist_shared(&shared(one_entry()));
        assert!(matches!(result, Err(MediaSiftError::Persistence { .. })));

        // The staged copy is cleaned up after the failed rename
        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![DEFAULT_SNAPSHOT_FILE.to_string()]);
    }

    #[test]
    fn test_try_load_reports_corrupt_index() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.snapshot_path(), b"MSIFTIDX but nothing after").unwrap();

        match store.try_load() {
            Err(MediaSiftError::CorruptIndex { path, .. }) => {
                assert_eq!(path, store.snapshot_path())
            }
            other => panic!("expected a corrupt index error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.persist(&mut one_entry()).unwrap();
        store.save_progress(1, 2).unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
    }
}
