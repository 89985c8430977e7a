//! Incremental, checkpointed indexing
//!
//! A run enumerates media under a root, keeps the files the snapshot does not
//! know yet, and embeds them one at a time in enumeration order. The shared
//! snapshot is persisted together with a progress record every
//! `checkpoint_interval` files, so an interrupted run resumes where it left off
//! without re-embedding anything already stored.

mod discovery;
mod progress;

pub use discovery::{enumerate, prepare_candidates, Candidate};
pub use progress::{NoProgress, ProgressObserver, StopFlag};

use crate::embedding::{normalized, Embedder, EmbeddingError};
use crate::error::Result;
use crate::media::{DecodeError, MediaNormalizer};
use crate::storage::{
    read_snapshot, write_snapshot, IndexEntry, IndexSnapshot, IndexStore, SharedSnapshot,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Why a single file was skipped. Only a model that cannot be loaded aborts
/// the run; every other failure is per file.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexerOptions {
    /// Persist snapshot and progress after this many files
    pub checkpoint_interval: usize,
    pub recursive: bool,
    /// Re-embed files whose mtime is newer than the stored fingerprint
    pub detect_changes: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100,
            recursive: true,
            detect_changes: false,
        }
    }
}

/// Counters of one run. `processed` includes files counted by the
/// interrupted run this one resumed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    pub total: usize,
    pub processed: usize,
    pub added: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Every candidate was already indexed; nothing was written
    NoNewFiles,
    /// All new files went through and the snapshot was persisted
    Completed(UpdateStats),
    /// Stopped between files; the progress record is left for the next run
    Cancelled(UpdateStats),
}

impl UpdateOutcome {
    pub fn did_work(&self) -> bool {
        matches!(self, UpdateOutcome::Completed(_))
    }

    pub fn stats(&self) -> Option<&UpdateStats> {
        match self {
            UpdateOutcome::NoNewFiles => None,
            UpdateOutcome::Completed(stats) | UpdateOutcome::Cancelled(stats) => Some(stats),
        }
    }
}

/// Sequential indexing worker over a shared snapshot.
///
/// Cloning is cheap; clones write into the same snapshot and store.
#[derive(Clone)]
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    normalizer: MediaNormalizer,
    store: IndexStore,
    snapshot: SharedSnapshot,
    options: IndexerOptions,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        normalizer: MediaNormalizer,
        store: IndexStore,
        snapshot: SharedSnapshot,
        options: IndexerOptions,
    ) -> Self {
        Self {
            embedder,
            normalizer,
            store,
            snapshot,
            options,
        }
    }

    pub fn snapshot(&self) -> &SharedSnapshot {
        &self.snapshot
    }

    /// Index every new media file under `root`
    pub fn update(
        &self,
        root: &Path,
        progress: &dyn ProgressObserver,
        stop: &StopFlag,
    ) -> Result<UpdateOutcome> {
        tracing::info!("Scanning {}", root.display());
        let files = enumerate(root, self.normalizer.extensions(), self.options.recursive)?;
        self.update_files(files, progress, stop)
    }

    /// Index the new files among an explicit list
    pub fn update_files<I>(
        &self,
        files: I,
        progress: &dyn ProgressObserver,
        stop: &StopFlag,
    ) -> Result<UpdateOutcome>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let started = Instant::now();
        let candidates = prepare_candidates(files, &self.normalizer);
        let found = candidates.len();

        let pending: Vec<Candidate> = {
            let snapshot = read_snapshot(&self.snapshot);
            candidates
                .into_iter()
                .filter(|c| self.is_new(&snapshot, c))
                .collect()
        };

        if pending.is_empty() {
            tracing::info!("No new files among {} candidates", found);
            progress.on_progress(0, 0);
            // A leftover record would only describe work that is already stored
            self.store.clear_progress()?;
            return Ok(UpdateOutcome::NoNewFiles);
        }

        let offset = match self.store.load_progress() {
            Some(record) => {
                tracing::info!(
                    "Resuming interrupted run ({}/{} files, {} left, saved {})",
                    record.processed_files,
                    record.total_files,
                    record.remaining(),
                    record.last_save_time
                );
                record.processed_files.min(record.total_files)
            }
            None => 0,
        };

        let total = offset + pending.len();
        let interval = self.options.checkpoint_interval.max(1);
        let mut stats = UpdateStats {
            total,
            processed: offset,
            ..UpdateStats::default()
        };
        let mut unsaved = 0usize;

        tracing::info!("Indexing {} new files ({} candidates)", pending.len(), found);

        for candidate in &pending {
            if stop.is_stop_requested() {
                tracing::info!("Stop requested at {}/{}", stats.processed, total);
                if unsaved > 0 {
                    self.checkpoint(stats.processed, total)?;
                }
                stats.duration_ms = elapsed_ms(started);
                return Ok(UpdateOutcome::Cancelled(stats));
            }

            match self.process(candidate) {
                Ok(previous) => {
                    stats.added += 1;
                    if previous.is_some() {
                        tracing::debug!("Re-embedded {}", candidate.path.display());
                    } else {
                        tracing::debug!("Indexed {}", candidate.path.display());
                    }
                }
                Err(ProcessingError::Embedding(EmbeddingError::InitializationError(message))) => {
                    tracing::error!(
                        "Embedding model unavailable, halting at {}/{}: {}",
                        stats.processed,
                        total,
                        message
                    );
                    if unsaved > 0 {
                        self.checkpoint(stats.processed, total)?;
                    }
                    return Err(EmbeddingError::InitializationError(message).into());
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!("Skipping {}: {}", candidate.path.display(), e);
                }
            }

            stats.processed += 1;
            unsaved += 1;
            progress.on_progress(stats.processed, total);

            if unsaved == interval {
                self.checkpoint(stats.processed, total)?;
                unsaved = 0;
            }
        }

        self.store.persist_shared(&self.snapshot)?;
        self.store.clear_progress()?;

        stats.duration_ms = elapsed_ms(started);
        tracing::info!(
            "Indexing complete: {} added, {} failed, {} entries in {} ms",
            stats.added,
            stats.failed,
            read_snapshot(&self.snapshot).len(),
            stats.duration_ms
        );

        Ok(UpdateOutcome::Completed(stats))
    }

    fn is_new(&self, snapshot: &IndexSnapshot, candidate: &Candidate) -> bool {
        match snapshot.get(&candidate.key()) {
            None => true,
            Some(stored) if self.options.detect_changes => {
                match (candidate.modified(), stored.modified) {
                    (Some(current), Some(known)) => current > known,
                    (Some(_), None) => true,
                    _ => false,
                }
            }
            Some(_) => false,
        }
    }

    /// Normalize, embed and insert one file. Returns the entry it replaced.
    fn process(
        &self,
        candidate: &Candidate,
    ) -> std::result::Result<Option<IndexEntry>, ProcessingError> {
        let image = self.normalizer.decode_as(&candidate.path, candidate.kind)?;
        let raw = self.embedder.embed_image(&image)?;
        let vector = normalized(&raw)?;

        let entry = IndexEntry {
            path: candidate.key(),
            vector,
            modified: candidate.modified(),
        };

        Ok(write_snapshot(&self.snapshot).insert(entry)?)
    }

    fn checkpoint(&self, processed: usize, total: usize) -> Result<()> {
        self.store.persist_shared(&self.snapshot)?;
        self.store.save_progress(processed, total)?;
        tracing::info!("Checkpoint saved at {}/{}", processed, total);
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
