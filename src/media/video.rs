//! First-frame extraction for video containers through OpenCV

use super::DecodeError;
use image::RgbImage;
use std::path::Path;

#[cfg(feature = "video")]
pub(super) fn first_frame(path: &Path) -> Result<RgbImage, DecodeError> {
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::{imgproc, videoio};

    let path_str = path
        .to_str()
        .ok_or_else(|| DecodeError::decode(path, "path is not valid UTF-8"))?;

    let mut capture =
        videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY).map_err(|e| {
            DecodeError::Open {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
    if !capture.is_opened().map_err(|e| DecodeError::decode(path, e))? {
        return Err(DecodeError::Open {
            path: path.to_path_buf(),
            message: "container could not be opened".to_string(),
        });
    }

    let mut frame = Mat::default();
    let grabbed = capture
        .read(&mut frame)
        .map_err(|e| DecodeError::decode(path, e))?;
    if !grabbed || frame.empty() {
        return Err(DecodeError::NoFrames {
            path: path.to_path_buf(),
        });
    }

    // OpenCV hands out BGR; the still-image path is RGB
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(&frame, &mut rgb, imgproc::COLOR_BGR2RGB)
        .map_err(|e| DecodeError::decode(path, e))?;

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let pixels = rgb
        .data_bytes()
        .map_err(|e| DecodeError::decode(path, e))?
        .to_vec();

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| DecodeError::decode(path, "frame buffer does not match dimensions"))
}

#[cfg(not(feature = "video"))]
pub(super) fn first_frame(path: &Path) -> Result<RgbImage, DecodeError> {
    Err(DecodeError::Unsupported {
        path: path.to_path_buf(),
        reason: "built without the `video` feature".to_string(),
    })
}
