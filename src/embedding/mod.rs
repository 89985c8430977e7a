//! Embedding model adapter
//!
//! Images and query text are projected into one shared vector space by a
//! CLIP-style model. Architecture:
//! - `Embedder` trait for abstraction over backends (and test doubles)
//! - `ClipEmbedder` backed by FastEmbed's CLIP ViT-B/32 vision + text models
//! - `vector` helpers: the single place where vectors get unit-normalized
mod provider;
pub mod vector;

pub use provider::{
    is_supported_model, ClipEmbedder, Embedder, EmbeddingError, CLIP_DIMENSION, DEFAULT_MODEL,
};
pub use vector::{dot, l2_norm, normalized};
