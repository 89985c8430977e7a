use super::{heif, video, DecodeError, MediaExtensions, MediaKind};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, RgbImage};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Location of the JPEG copy written next to a HEIC/HEIF original
pub fn converted_path(path: &Path) -> PathBuf {
    path.with_extension("jpg")
}

/// Turns any recognized media file into a canonical RGB image
#[derive(Debug, Clone)]
pub struct MediaNormalizer {
    extensions: MediaExtensions,
    jpeg_quality: u8,
}

impl MediaNormalizer {
    pub fn new(extensions: MediaExtensions, jpeg_quality: u8) -> Self {
        Self {
            extensions,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn extensions(&self) -> &MediaExtensions {
        &self.extensions
    }

    /// Decode `path` into RGB, or `None` if it cannot be decoded.
    ///
    /// Failures are logged here; callers treat `None` as "skip this file".
    pub fn normalize(&self, path: &Path) -> Option<DynamicImage> {
        match self.try_normalize(path) {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Same as [`normalize`](Self::normalize) but keeps the failure reason
    pub fn try_normalize(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
        let kind = self
            .extensions
            .classify(path)
            .ok_or_else(|| DecodeError::Unsupported {
                path: path.to_path_buf(),
                reason: "unrecognized extension".to_string(),
            })?;

        self.decode_as(path, kind)
    }

    /// Decode `path` as an already classified kind of media
    pub fn decode_as(&self, path: &Path, kind: MediaKind) -> Result<DynamicImage, DecodeError> {
        let rgb = match kind {
            MediaKind::Raster => decode_raster(path)?,
            MediaKind::Heif => {
                let jpeg = self.convert_heif(path)?;
                decode_raster(&jpeg)?
            }
            MediaKind::Video => video::first_frame(path)?,
        };

        Ok(DynamicImage::ImageRgb8(rgb))
    }

    /// Make sure a JPEG copy of a HEIC/HEIF file exists and return its path.
    ///
    /// An existing copy strictly newer than the original is reused as is.
    pub fn convert_heif(&self, path: &Path) -> Result<PathBuf, DecodeError> {
        let target = converted_path(path);

        if is_newer(&target, path) {
            tracing::trace!("Reusing converted copy {}", target.display());
            return Ok(target);
        }

        let rgb = heif::decode(path)?;
        write_jpeg(&rgb, &target, self.jpeg_quality)?;
        tracing::info!("Converted {} -> {}", path.display(), target.display());

        Ok(target)
    }
}

impl Default for MediaNormalizer {
    fn default() -> Self {
        Self::new(MediaExtensions::default(), 95)
    }
}

fn decode_raster(path: &Path) -> Result<RgbImage, DecodeError> {
    let reader = ImageReader::open(path)
        .map_err(|e| DecodeError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .with_guessed_format()
        .map_err(|e| DecodeError::decode(path, e))?;

    let image = reader.decode().map_err(|e| DecodeError::decode(path, e))?;
    Ok(image.to_rgb8())
}

fn is_newer(candidate: &Path, reference: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(candidate), modified(reference)) {
        (Some(c), Some(r)) => c > r,
        _ => false,
    }
}

/// Write through a temporary sibling so a crash never leaves a half-written copy
fn write_jpeg(rgb: &RgbImage, target: &Path, quality: u8) -> Result<(), DecodeError> {
    let write_err = |message: String| DecodeError::Write {
        path: target.to_path_buf(),
        message,
    };

    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| write_err(e.to_string()))?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| write_err(e.to_string()))?;
        writer.flush().map_err(|e| write_err(e.to_string()))?;
    }
    staged
        .persist(target)
        .map_err(|e| write_err(e.error.to_string()))?;

    Ok(())
}
