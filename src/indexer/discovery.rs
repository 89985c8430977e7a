//! Candidate discovery: directory walk, HEIC pre-conversion, de-duplication

use crate::error::{MediaSiftError, Result};
use crate::media::{MediaExtensions, MediaKind, MediaNormalizer};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// A file the indexer may embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Path that is decoded and used as the index key
    pub path: PathBuf,
    pub kind: MediaKind,
    /// HEIC/HEIF original when `path` is its converted copy
    pub origin: Option<PathBuf>,
}

impl Candidate {
    pub fn new(path: PathBuf, kind: MediaKind) -> Self {
        Self {
            path,
            kind,
            origin: None,
        }
    }

    /// Snapshot key: the path string as discovered
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Change fingerprint in seconds since the epoch.
    ///
    /// For converted copies this is the newer of the copy and its original.
    pub fn modified(&self) -> Option<i64> {
        let own = modified_secs(&self.path);
        let origin = self.origin.as_deref().and_then(modified_secs);
        own.max(origin)
    }
}

/// List every recognized media file under `root`, ordered by file name.
///
/// A missing or unreadable root is an error; unreadable entries below it are
/// logged and skipped.
pub fn enumerate(
    root: &Path,
    extensions: &MediaExtensions,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(MediaSiftError::Enumeration {
            path: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let mut walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(MediaSiftError::Enumeration {
                    path: root.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && extensions.classify(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }

    tracing::debug!("Found {} media files under {}", files.len(), root.display());
    Ok(files)
}

/// Classify files and convert HEIC/HEIF originals up front.
///
/// A converted copy replaces its original in the list. Duplicates keep the
/// position of their first occurrence. Unrecognized files and failed
/// conversions are dropped.
pub fn prepare_candidates<I>(files: I, normalizer: &MediaNormalizer) -> Vec<Candidate>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen: HashMap<PathBuf, usize> = HashMap::new();

    for file in files {
        let Some(kind) = normalizer.extensions().classify(&file) else {
            tracing::trace!("Ignoring {}", file.display());
            continue;
        };

        let candidate = match kind {
            MediaKind::Heif => match normalizer.convert_heif(&file) {
                Ok(converted) => Candidate {
                    path: converted,
                    kind: MediaKind::Raster,
                    origin: Some(file),
                },
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.display(), e);
                    continue;
                }
            },
            _ => Candidate::new(file, kind),
        };

        match seen.get(&candidate.path) {
            Some(&index) => {
                if candidates[index].origin.is_none() {
                    candidates[index].origin = candidate.origin;
                }
            }
            None => {
                seen.insert(candidate.path.clone(), candidates.len());
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn modified_secs(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}
