use crate::embedding::EmbeddingError;
use crate::storage::SnapshotError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mediasift
#[derive(Error, Debug)]
pub enum MediaSiftError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Snapshot or progress record could not be written
    #[error("Failed to persist {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    /// Snapshot file exists but cannot be decoded
    #[error("Corrupt index {path}: {source}")]
    CorruptIndex {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    /// Media directory missing or unreadable
    #[error("Cannot enumerate media under {path}: {message}")]
    Enumeration { path: PathBuf, message: String },

    /// Model or query embedding failures that abort the operation
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Background update task failed to complete
    #[error("Background task failed: {0}")]
    Task(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MediaSiftError {
    pub fn io(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for mediasift operations
pub type Result<T> = std::result::Result<T, MediaSiftError>;
