//! Engine facade: one store, one shared snapshot, one model handle
//!
//! The engine wires the pieces together from a [`Config`]. Indexing runs on
//! the caller's thread through [`Engine::update`] or on tokio's blocking pool
//! through [`Engine::spawn_update`]; searches read the same in-memory snapshot
//! and may run while an update is in flight.

use crate::config::Config;
use crate::embedding::{ClipEmbedder, Embedder};
use crate::error::{MediaSiftError, Result};
use crate::indexer::{Indexer, IndexerOptions, ProgressObserver, StopFlag, UpdateOutcome};
use crate::media::{MediaExtensions, MediaNormalizer};
use crate::search::{Page, SearchHit, Searcher};
use crate::storage::{read_snapshot, shared, IndexStore, ProgressRecord, SharedSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Point-in-time view of the index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    /// A readable snapshot with at least one entry is on disk
    pub exists: bool,
    /// Entries in the in-memory snapshot
    pub entries: usize,
    pub dimension: Option<usize>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Progress of an interrupted run, if one is waiting to be resumed
    pub pending_progress: Option<ProgressRecord>,
    pub snapshot_path: PathBuf,
}

/// An update running on the blocking pool
pub struct UpdateHandle {
    task: JoinHandle<Result<UpdateOutcome>>,
    stop: StopFlag,
}

impl UpdateHandle {
    /// Ask the run to stop after the current file
    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end
    pub async fn join(self) -> Result<UpdateOutcome> {
        self.task
            .await
            .map_err(|e| MediaSiftError::Task(e.to_string()))?
    }
}

pub struct Engine {
    store: IndexStore,
    snapshot: SharedSnapshot,
    indexer: Indexer,
    searcher: Searcher,
    media_dir: PathBuf,
    fetch_limit: usize,
}

impl Engine {
    /// Build an engine backed by the configured CLIP model.
    ///
    /// No weights are loaded until the first embedding is requested.
    pub fn open(config: &Config) -> Result<Self> {
        let embedder = ClipEmbedder::new(
            &config.embedding.model,
            config.cache_dir()?,
            config.embedding.show_download_progress,
        )?;
        Self::with_embedder(config, Arc::new(embedder))
    }

    /// Build an engine around an existing embedding backend
    pub fn with_embedder(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = IndexStore::new(
            &config.data_dir()?,
            &config.storage.snapshot_file,
            &config.storage.progress_file,
        )?;
        let snapshot = shared(store.load());

        let normalizer = MediaNormalizer::new(
            MediaExtensions::new(
                &config.indexing.image_extensions,
                &config.indexing.video_extensions,
            ),
            config.indexing.jpeg_quality,
        );
        let options = IndexerOptions {
            checkpoint_interval: config.indexing.checkpoint_interval,
            recursive: config.indexing.recursive,
            detect_changes: config.indexing.detect_changes,
        };

        tracing::debug!(
            "Engine ready: model {}, index {}",
            embedder.model_name(),
            store.snapshot_path().display()
        );

        Ok(Self {
            indexer: Indexer::new(
                embedder.clone(),
                normalizer,
                store.clone(),
                snapshot.clone(),
                options,
            ),
            searcher: Searcher::new(embedder, snapshot.clone()),
            store,
            snapshot,
            media_dir: config.media_dir()?,
            fetch_limit: config.search.fetch_limit,
        })
    }

    pub fn snapshot(&self) -> &SharedSnapshot {
        &self.snapshot
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Directory indexed when the caller names none
    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Index every new media file under `root`
    pub fn update(
        &self,
        root: &Path,
        progress: &dyn ProgressObserver,
        stop: &StopFlag,
    ) -> Result<UpdateOutcome> {
        self.indexer.update(root, progress, stop)
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
        self.indexer.update_files(files, progress, stop)
    }

    /// Run [`update`](Self::update) on tokio's blocking pool.
    ///
    /// Must be called from within a tokio runtime. Searches keep working
    /// against the same snapshot while the update runs.
    pub fn spawn_update<P>(&self, root: PathBuf, progress: P, stop: StopFlag) -> UpdateHandle
    where
        P: ProgressObserver + Send + 'static,
    {
        let indexer = self.indexer.clone();
        let flag = stop.clone();
        let task = tokio::task::spawn_blocking(move || indexer.update(&root, &progress, &flag));
        UpdateHandle { task, stop }
    }

    /// Best `top_k` matches for `query`
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.searcher.search(query, top_k)
    }

    /// One 1-based page out of the configured fetch limit
    pub fn search_page(&self, query: &str, page: usize, per_page: usize) -> Result<Page> {
        self.searcher
            .search_page(query, self.fetch_limit, page, per_page)
    }

    /// Health probe over the persisted snapshot
    pub fn exists_and_nonempty(&self) -> bool {
        self.store.exists_and_nonempty()
    }

    /// Time of the last successful persist
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.store.last_update_time()
    }

    pub fn status(&self) -> IndexStatus {
        let (entries, dimension) = {
            let snapshot = read_snapshot(&self.snapshot);
            (snapshot.len(), snapshot.dimension())
        };

        IndexStatus {
            exists: self.store.exists_and_nonempty(),
            entries,
            dimension,
            last_updated: self.store.last_update_time(),
            pending_progress: self.store.load_progress(),
            snapshot_path: self.store.snapshot_path().to_path_buf(),
        }
    }
}
