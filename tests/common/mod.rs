//! Shared fixtures: a deterministic embedder and generated test images
#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use mediasift::config::Config;
use mediasift::embedding::{Embedder, EmbeddingError};
use mediasift::Engine;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Embeds images as their mean color and queries by color keywords.
///
/// "red", "green" and "blue" point at the matching channel; any other text
/// points at gray. Counts image embeddings so tests can detect re-work.
#[derive(Default)]
pub struct ColorEmbedder {
    image_calls: AtomicUsize,
}

impl ColorEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

impl Embedder for ColorEmbedder {
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbeddingError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);

        let rgb = image.to_rgb8();
        let n = (rgb.width() * rgb.height()).max(1) as f32;
        let mut sum = [0f32; 3];
        for pixel in rgb.pixels() {
            for (s, c) in sum.iter_mut().zip(pixel.0) {
                *s += c as f32;
            }
        }
        // Not unit length on purpose; the indexer normalizes
        Ok(sum.iter().map(|s| s / n).collect())
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = text.to_lowercase();
        let vector = if text.contains("red") {
            vec![3.0, 0.0, 0.0]
        } else if text.contains("green") {
            vec![0.0, 3.0, 0.0]
        } else if text.contains("blue") {
            vec![0.0, 0.0, 3.0]
        } else {
            vec![1.0, 1.0, 1.0]
        };
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "mean-color"
    }
}

/// Temporary media and data directories plus a matching config
pub struct Library {
    pub temp: TempDir,
    pub config: Config,
}

impl Library {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = temp.path().join("data");
        config.indexing.media_dir = temp.path().join("media");
        std::fs::create_dir_all(&config.indexing.media_dir).unwrap();
        Self { temp, config }
    }

    pub fn media(&self) -> PathBuf {
        self.config.indexing.media_dir.clone()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config
            .storage
            .data_dir
            .join(&self.config.storage.snapshot_file)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.config
            .storage
            .data_dir
            .join(&self.config.storage.progress_file)
    }

    /// Write a solid-color PNG into the media directory
    pub fn image(&self, name: &str, color: [u8; 3]) -> PathBuf {
        write_image(&self.media(), name, color)
    }

    pub fn engine(&self, embedder: &Arc<ColorEmbedder>) -> Engine {
        let embedder: Arc<dyn Embedder> = embedder.clone();
        Engine::with_embedder(&self.config, embedder).unwrap()
    }
}

pub fn write_image(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(8, 8, Rgb(color)).save(&path).unwrap();
    path
}

/// Distinct, never-black colors for bulk fixtures
pub fn palette(i: usize) -> [u8; 3] {
    [
        (40 + (i * 37) % 200) as u8,
        (40 + (i * 71) % 200) as u8,
        (40 + (i * 13) % 200) as u8,
    ]
}
