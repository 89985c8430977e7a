/// Embedding model trait and the FastEmbed CLIP implementation
use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};
use image::{DynamicImage, ImageFormat};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use thiserror::Error;

/// Output dimension of both CLIP ViT-B/32 towers
pub const CLIP_DIMENSION: usize = 512;

/// Model used when the configuration does not name one
pub const DEFAULT_MODEL: &str = "clip-ViT-B-32";

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitializationError(String),

    #[error("Embedding generation failed: {0}")]
    GenerationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector cannot be normalized (norm = {0})")]
    DegenerateVector(f32),
}

/// Names accepted for the CLIP ViT-B/32 pair
const MODEL_ALIASES: &[&str] = &["clip-ViT-B-32", "clip-vit-b-32", "Qdrant/clip-ViT-B-32"];

pub fn is_supported_model(name: &str) -> bool {
    MODEL_ALIASES.contains(&name)
}

/// Multimodal embedding backend.
///
/// Image and text vectors must live in the same space so that a text query
/// can be compared against image vectors. Returned vectors need not be unit
/// length; callers normalize them.
pub trait Embedder: Send + Sync {
    /// Embed a decoded RGB image
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed a free-text query
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// CLIP ViT-B/32 through FastEmbed (ONNX runtime, fully local).
///
/// Both towers are loaded on first use and then reused for every call made
/// through this handle. Share the handle with `Arc` instead of building a
/// second one, since each load reads the full weights from disk.
pub struct ClipEmbedder {
    model_name: String,
    cache_dir: Option<PathBuf>,
    show_download_progress: bool,
    vision: OnceCell<ImageEmbedding>,
    text: OnceCell<TextEmbedding>,
}

impl ClipEmbedder {
    /// Create an embedder for the named model without loading any weights.
    ///
    /// **Important**: weights are downloaded on first use to the FastEmbed
    /// cache (or `cache_dir`). The vision tower is ~350MB, the text tower ~250MB.
    pub fn new(
        model_name: &str,
        cache_dir: Option<PathBuf>,
        show_download_progress: bool,
    ) -> Result<Self, EmbeddingError> {
        if !is_supported_model(model_name) {
            return Err(EmbeddingError::InitializationError(format!(
                "Unsupported model: {}. Supported: {}",
                model_name, DEFAULT_MODEL
            )));
        }

        Ok(Self {
            model_name: model_name.to_string(),
            cache_dir,
            show_download_progress,
            vision: OnceCell::new(),
            text: OnceCell::new(),
        })
    }

    /// Create embedder with default model (clip-ViT-B-32)
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new(DEFAULT_MODEL, None, true)
    }

    fn vision(&self) -> Result<&ImageEmbedding, EmbeddingError> {
        self.vision.get_or_try_init(|| {
            tracing::info!(
                "Loading CLIP vision model: {} ({}D)",
                self.model_name,
                CLIP_DIMENSION
            );
            let mut options = ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32)
                .with_show_download_progress(self.show_download_progress);
            if let Some(dir) = &self.cache_dir {
                options = options.with_cache_dir(dir.clone());
            }
            ImageEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::InitializationError(e.to_string()))
        })
    }

    fn text(&self) -> Result<&TextEmbedding, EmbeddingError> {
        self.text.get_or_try_init(|| {
            tracing::info!(
                "Loading CLIP text model: {} ({}D)",
                self.model_name,
                CLIP_DIMENSION
            );
            let mut options = InitOptions::new(EmbeddingModel::ClipVitB32)
                .with_show_download_progress(self.show_download_progress);
            if let Some(dir) = &self.cache_dir {
                options = options.with_cache_dir(dir.clone());
            }
            TextEmbedding::try_new(options)
                .map_err(|e| EmbeddingError::InitializationError(e.to_string()))
        })
    }

    fn check_dimension(&self, mut embeddings: Vec<Vec<f32>>) -> Result<Vec<f32>, EmbeddingError> {
        let embedding = embeddings.pop().ok_or_else(|| {
            EmbeddingError::GenerationError("No embeddings generated".to_string())
        })?;

        if embedding.len() != CLIP_DIMENSION {
            return Err(EmbeddingError::DimensionMismatch {
                expected: CLIP_DIMENSION,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }
}

impl Embedder for ClipEmbedder {
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>, EmbeddingError> {
        let model = self.vision()?;

        // FastEmbed reads images from disk, so hand it a lossless temporary copy
        let mut staged = tempfile::Builder::new()
            .prefix("mediasift-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;
        image
            .write_to(staged.as_file_mut(), ImageFormat::Png)
            .map_err(|e| EmbeddingError::InvalidInput(e.to_string()))?;

        let embeddings = model
            .embed(vec![staged.path()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        self.check_dimension(embeddings)
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let embeddings = self
            .text()?
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        self.check_dimension(embeddings)
    }

    fn dimension(&self) -> usize {
        CLIP_DIMENSION
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
