//! In-memory index snapshot and its versioned on-disk encoding
//!
//! File layout:
//!
//! ```text
//! Preamble  { magic: b"MSIFTIDX", version: u32 }          bincode
//! HeaderV1  { entries, dimension, last_updated, checksum } bincode
//! body      zstd(bincode(Vec<IndexEntry>))                 checksum = blake3(body)
//! ```
//!
//! The preamble never changes; readers dispatch on `version` to pick the
//! header/body decoder.

use crate::embedding::EmbeddingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::io::Read;
use thiserror::Error;

pub const MAGIC: [u8; 8] = *b"MSIFTIDX";
pub const FORMAT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Not a snapshot file (bad magic)")]
    BadMagic,

    #[error("Unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),

    #[error("Malformed snapshot header: {0}")]
    Header(String),

    #[error("Snapshot checksum mismatch")]
    ChecksumMismatch,

    #[error("Malformed snapshot body: {0}")]
    Body(String),

    #[error("Snapshot is inconsistent: {0}")]
    Inconsistent(String),

    #[error("Failed to encode snapshot: {0}")]
    Encode(String),
}

/// One indexed media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path as discovered on disk; the unique key
    pub path: String,
    /// Unit-length embedding
    pub vector: Vec<f32>,
    /// Source mtime (seconds since epoch) when the vector was computed
    pub modified: Option<i64>,
}

/// Cheap-to-read summary stored ahead of the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u32,
    pub entries: u64,
    pub dimension: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
struct Preamble {
    magic: [u8; 8],
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct HeaderV1 {
    entries: u64,
    dimension: u32,
    last_updated_ms: Option<i64>,
    checksum: [u8; 32],
}

/// The full path → vector collection.
///
/// Iteration is ordered by path so rankings and encodings are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    entries: BTreeMap<String, IndexEntry>,
    dimension: Option<usize>,
    last_updated: Option<DateTime<Utc>>,
}

impl IndexSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, IndexEntry> {
        self.entries.values()
    }

    /// Vector dimension shared by all entries, once the first one is stored
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn set_last_updated(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }

    /// Insert or replace an entry, returning the previous one.
    ///
    /// All vectors in a snapshot share one dimension; the first insert fixes it.
    pub fn insert(&mut self, entry: IndexEntry) -> Result<Option<IndexEntry>, EmbeddingError> {
        match self.dimension {
            Some(expected) if expected != entry.vector.len() => {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: entry.vector.len(),
                });
            }
            None if entry.vector.is_empty() => {
                return Err(EmbeddingError::InvalidInput("Empty vector".to_string()));
            }
            None => self.dimension = Some(entry.vector.len()),
            _ => {}
        }

        Ok(self.entries.insert(entry.path.clone(), entry))
    }

    /// Serialize into the current on-disk format
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let entries: Vec<&IndexEntry> = self.entries.values().collect();
        let encode_err = |e: bincode::Error| SnapshotError::Encode(e.to_string());

        let raw = bincode::serialize(&entries).map_err(encode_err)?;
        let body = zstd::encode_all(&raw[..], ZSTD_LEVEL)
            .map_err(|e| SnapshotError::Encode(e.to_string()))?;

        let preamble = Preamble {
            magic: MAGIC,
            version: FORMAT_VERSION,
        };
        let header = HeaderV1 {
            entries: entries.len() as u64,
            dimension: self.dimension.unwrap_or(0) as u32,
            last_updated_ms: self.last_updated.map(|t| t.timestamp_millis()),
            checksum: *blake3::hash(&body).as_bytes(),
        };

        let mut out = bincode::serialize(&preamble).map_err(encode_err)?;
        out.extend(bincode::serialize(&header).map_err(encode_err)?);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Parse a full snapshot, verifying magic, version and checksum
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let mut reader = bytes;
        let version = read_preamble(&mut reader)?;

        match version {
            1 => decode_v1(&mut reader),
            other => Err(SnapshotError::UnsupportedVersion(other)),
        }
    }
}

/// Read only the fixed-size header of an encoded snapshot
pub fn read_header<R: Read>(mut reader: R) -> Result<SnapshotHeader, SnapshotError> {
    let version = read_preamble(&mut reader)?;

    match version {
        1 => {
            let header = read_header_v1(&mut reader)?;
            Ok(SnapshotHeader {
                version,
                entries: header.entries,
                dimension: header.dimension,
                last_updated: header
                    .last_updated_ms
                    .and_then(DateTime::<Utc>::from_timestamp_millis),
            })
        }
        other => Err(SnapshotError::UnsupportedVersion(other)),
    }
}

fn read_preamble<R: Read>(reader: &mut R) -> Result<u32, SnapshotError> {
    let preamble: Preamble =
        bincode::deserialize_from(reader).map_err(|e| SnapshotError::Header(e.to_string()))?;
    if preamble.magic != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    Ok(preamble.version)
}

fn read_header_v1<R: Read>(reader: &mut R) -> Result<HeaderV1, SnapshotError> {
    bincode::deserialize_from(reader).map_err(|e| SnapshotError::Header(e.to_string()))
}

fn decode_v1(reader: &mut &[u8]) -> Result<IndexSnapshot, SnapshotError> {
    let header = read_header_v1(reader)?;
    let body: &[u8] = *reader;

    if *blake3::hash(body).as_bytes() != header.checksum {
        return Err(SnapshotError::ChecksumMismatch);
    }

    let raw = zstd::decode_all(body).map_err(|e| SnapshotError::Body(e.to_string()))?;
    let entries: Vec<IndexEntry> =
        bincode::deserialize(&raw).map_err(|e| SnapshotError::Body(e.to_string()))?;

    if entries.len() as u64 != header.entries {
        return Err(SnapshotError::Inconsistent(format!(
            "header lists {} entries, body has {}",
            header.entries,
            entries.len()
        )));
    }

    let mut snapshot = IndexSnapshot::new();
    for entry in entries {
        if entry.vector.len() != header.dimension as usize {
            return Err(SnapshotError::Inconsistent(format!(
                "{} has dimension {}, expected {}",
                entry.path,
                entry.vector.len(),
                header.dimension
            )));
        }
        snapshot
            .insert(entry)
            .map_err(|e| SnapshotError::Inconsistent(e.to_string()))?;
    }
    snapshot.last_updated = header
        .last_updated_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    Ok(snapshot)
}
