//! Media normalization
//!
//! Every supported input (plain raster images, HEIC/HEIF containers, video
//! files) is reduced to one canonical 3-channel RGB image before embedding.

mod heif;
mod normalizer;
mod video;

pub use normalizer::{converted_path, MediaNormalizer};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions treated as HEIC-family containers (compared case-insensitively)
pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif"];

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("{path} contains no decodable frames")]
    NoFrames { path: PathBuf },

    #[error("Failed to write converted copy {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Unsupported media {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
}

impl DecodeError {
    pub(crate) fn decode(path: &Path, message: impl ToString) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// How a file has to be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Formats the `image` crate decodes directly
    Raster,
    /// HEIC/HEIF containers, converted to a JPEG sibling first
    Heif,
    /// Video containers; only the first frame is used
    Video,
}

/// Recognized extensions, lower-cased, without the leading dot
#[derive(Debug, Clone)]
pub struct MediaExtensions {
    image: Vec<String>,
    video: Vec<String>,
}

impl MediaExtensions {
    pub fn new<I, V>(image: I, video: V) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        let clean = |ext: &str| ext.trim().trim_start_matches('.').to_ascii_lowercase();
        Self {
            image: image.into_iter().map(|e| clean(e.as_ref())).collect(),
            video: video.into_iter().map(|e| clean(e.as_ref())).collect(),
        }
    }

    /// Classify a path by extension; `None` means "not a media file"
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        if self.video.iter().any(|v| *v == ext) {
            Some(MediaKind::Video)
        } else if self.image.iter().any(|i| *i == ext) {
            if HEIF_EXTENSIONS.contains(&ext.as_str()) {
                Some(MediaKind::Heif)
            } else {
                Some(MediaKind::Raster)
            }
        } else {
            None
        }
    }
}

impl Default for MediaExtensions {
    fn default() -> Self {
        Self::new(
            ["jpg", "jpeg", "png", "heic", "heif"],
            ["mov", "mp4", "m4v", "avi"],
        )
    }
}
