//! Configuration management for mediasift
//!
//! Loads the TOML configuration, applies `MEDIASIFT_SECTION__KEY` environment
//! overrides and named profiles, then validates the result as a whole.

use crate::error::{MediaSiftError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod validator;

pub use validator::ConfigValidator;

/// Schema version written by `config init` and accepted by the validator
pub const SCHEMA_VERSION: &str = "1.0.0";

const ENV_PREFIX: &str = "MEDIASIFT_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Where the snapshot and progress record live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub snapshot_file: String,
    pub progress_file: String,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Model weight cache; FastEmbed's default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub show_download_progress: bool,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Directory indexed when `index` gets no argument
    pub media_dir: PathBuf,
    pub checkpoint_interval: usize,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default)]
    pub detect_changes: bool,
    /// Quality of JPEG copies written for HEIC/HEIF originals
    pub jpeg_quality: u8,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results ranked before pagination
    pub fetch_limit: usize,
    pub per_page: usize,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detect_changes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MediaSiftError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MediaSiftError::io(e, format!("Failed to read config file: {:?}", path))
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            MediaSiftError::io(e, format!("Failed to write config file: {:?}", path))
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self.profiles.get(profile).cloned().ok_or_else(|| {
            MediaSiftError::Config(format!("Unknown profile: {}", profile))
        })?;

        if let Some(interval) = overrides.checkpoint_interval {
            self.indexing.checkpoint_interval = interval;
        }
        if let Some(detect) = overrides.detect_changes {
            self.indexing.detect_changes = detect;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }

        tracing::debug!("Applied profile {}", profile);
        ConfigValidator::validate(self)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: MEDIASIFT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `(variable, value)` pairs; names without the prefix are ignored
    pub fn apply_overrides<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, value.as_ref()) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__CACHE_DIR" => self.embedding.cache_dir = Some(PathBuf::from(value)),
            "EMBEDDING__SHOW_DOWNLOAD_PROGRESS" => {
                self.embedding.show_download_progress = parse_env(path, value)?;
            }
            "INDEXING__MEDIA_DIR" => self.indexing.media_dir = PathBuf::from(value),
            "INDEXING__CHECKPOINT_INTERVAL" => {
                self.indexing.checkpoint_interval = parse_env(path, value)?;
            }
            "INDEXING__RECURSIVE" => self.indexing.recursive = parse_env(path, value)?,
            "INDEXING__DETECT_CHANGES" => self.indexing.detect_changes = parse_env(path, value)?,
            "SEARCH__FETCH_LIMIT" => self.search.fetch_limit = parse_env(path, value)?,
            "SEARCH__PER_PAGE" => self.search.per_page = parse_env(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Data directory with `~/` expanded
    pub fn data_dir(&self) -> Result<PathBuf> {
        expand_path(&self.storage.data_dir)
    }

    /// Default media directory with `~/` expanded
    pub fn media_dir(&self) -> Result<PathBuf> {
        expand_path(&self.indexing.media_dir)
    }

    /// Model cache directory with `~/` expanded
    pub fn cache_dir(&self) -> Result<Option<PathBuf>> {
        self.embedding.cache_dir.as_deref().map(expand_path).transpose()
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            MediaSiftError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("mediasift").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.mediasift"),
                snapshot_file: crate::storage::DEFAULT_SNAPSHOT_FILE.to_string(),
                progress_file: crate::storage::DEFAULT_PROGRESS_FILE.to_string(),
            },
            embedding: EmbeddingConfig {
                model: crate::embedding::DEFAULT_MODEL.to_string(),
                cache_dir: None,
                show_download_progress: true,
            },
            indexing: IndexingConfig {
                media_dir: PathBuf::from("Photos"),
                checkpoint_interval: 100,
                image_extensions: ["jpg", "jpeg", "png", "heic", "heif"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                video_extensions: ["mov", "mp4", "m4v", "avi"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                recursive: true,
                detect_changes: false,
                jpeg_quality: 95,
            },
            search: SearchConfig {
                fetch_limit: crate::search::DEFAULT_FETCH_LIMIT,
                per_page: 30,
            },
            profiles: HashMap::new(),
        }
    }
}

fn parse_env<T: FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MediaSiftError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| MediaSiftError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| MediaSiftError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
