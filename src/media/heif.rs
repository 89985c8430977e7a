//! HEIC/HEIF decoding through libheif

use super::DecodeError;
use image::RgbImage;
use std::path::Path;

#[cfg(feature = "heif")]
pub(super) fn decode(path: &Path) -> Result<RgbImage, DecodeError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let path_str = path
        .to_str()
        .ok_or_else(|| DecodeError::decode(path, "path is not valid UTF-8"))?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str).map_err(|e| DecodeError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| DecodeError::decode(path, e))?;
    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| DecodeError::decode(path, e))?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| DecodeError::decode(path, "no interleaved RGB plane"))?;

    // Rows may be padded past width * 3
    let row_bytes = plane.width as usize * 3;
    let mut pixels = Vec::with_capacity(row_bytes * plane.height as usize);
    for row in 0..plane.height as usize {
        let start = row * plane.stride;
        let line = plane
            .data
            .get(start..start + row_bytes)
            .ok_or_else(|| DecodeError::decode(path, "truncated pixel data"))?;
        pixels.extend_from_slice(line);
    }

    RgbImage::from_raw(plane.width, plane.height, pixels)
        .ok_or_else(|| DecodeError::decode(path, "pixel buffer does not match dimensions"))
}

#[cfg(not(feature = "heif"))]
pub(super) fn decode(path: &Path) -> Result<RgbImage, DecodeError> {
    Err(DecodeError::Unsupported {
        path: path.to_path_buf(),
        reason: "built without the `heif` feature".to_string(),
    })
}
