use crate::config::{Config, SCHEMA_VERSION};
use crate::embedding::is_supported_model;
use crate::error::{MediaSiftError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_profiles(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MediaSiftError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        let storage = &config.storage;

        if storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }

        for (key, name) in [
            ("storage.snapshot_file", &storage.snapshot_file),
            ("storage.progress_file", &storage.progress_file),
        ] {
            if !Self::is_plain_file_name(name) {
                errors.push(ValidationError::new(
                    key,
                    format!("Expected a file name inside data_dir, got '{}'", name),
                ));
            }
        }

        if storage.snapshot_file == storage.progress_file {
            errors.push(ValidationError::new(
                "storage.progress_file",
                "Progress file must differ from the snapshot file",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let model = &config.embedding.model;
        if model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        } else if !is_supported_model(model) {
            errors.push(ValidationError::new(
                "embedding.model",
                format!("Unsupported model '{}'", model),
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        let indexing = &config.indexing;

        if indexing.media_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "indexing.media_dir",
                "Media directory cannot be empty",
            ));
        }

        if indexing.checkpoint_interval == 0 {
            errors.push(ValidationError::new(
                "indexing.checkpoint_interval",
                "Checkpoint interval must be greater than 0",
            ));
        }

        if indexing.image_extensions.is_empty() && indexing.video_extensions.is_empty() {
            errors.push(ValidationError::new(
                "indexing.image_extensions",
                "At least one image or video extension is required",
            ));
        }

        for (key, list) in [
            ("indexing.image_extensions", &indexing.image_extensions),
            ("indexing.video_extensions", &indexing.video_extensions),
        ] {
            if list.iter().any(|ext| ext.trim().trim_start_matches('.').is_empty()) {
                errors.push(ValidationError::new(key, "Extensions cannot be empty"));
            }
        }

        if !(1..=100).contains(&indexing.jpeg_quality) {
            errors.push(ValidationError::new(
                "indexing.jpeg_quality",
                format!(
                    "JPEG quality must be between 1 and 100, got {}",
                    indexing.jpeg_quality
                ),
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.fetch_limit == 0 {
            errors.push(ValidationError::new(
                "search.fetch_limit",
                "Fetch limit must be greater than 0",
            ));
        }

        if config.search.per_page == 0 {
            errors.push(ValidationError::new(
                "search.per_page",
                "Page size must be greater than 0",
            ));
        }
    }

    fn validate_profiles(config: &Config, errors: &mut Vec<ValidationError>) {
        for (name, overrides) in &config.profiles {
            if overrides.checkpoint_interval == Some(0) {
                errors.push(ValidationError::new(
                    format!("profiles.{}.checkpoint_interval", name),
                    "Checkpoint interval must be greater than 0",
                ));
            }

            if let Some(model) = &overrides.embedding_model {
                if !is_supported_model(model) {
                    errors.push(ValidationError::new(
                        format!("profiles.{}.embedding_model", name),
                        format!("Unsupported model '{}'", model),
                    ));
                }
            }
        }
    }

    fn is_plain_file_name(name: &str) -> bool {
        !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileOverrides;

    fn error_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(MediaSiftError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_zero_checkpoint_interval() {
        let mut config = Config::default();
        config.indexing.checkpoint_interval = 0;
        assert_eq!(error_paths(&config), vec!["indexing.checkpoint_interval"]);
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = Config::default();
        config.meta.schema_version = "0.1".to_string();
        config.embedding.model = "resnet".to_string();
        config.search.per_page = 0;
        config.indexing.jpeg_quality = 0;

        let paths = error_paths(&config);
        assert_eq!(paths.len(), 4);
        assert!(paths.contains(&"embedding.model".to_string()));
        assert!(paths.contains(&"indexing.jpeg_quality".to_string()));
    }

    #[test]
    fn test_file_names_must_be_plain() {
        let mut config = Config::default();
        config.storage.snapshot_file = "../escape.bin".to_string();
        assert_eq!(error_paths(&config), vec!["storage.snapshot_file"]);
    }

    #[test]
    fn test_invalid_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "bad".to_string(),
            ProfileOverrides {
                checkpoint_interval: Some(0),
                ..ProfileOverrides::default()
            },
        );
        assert_eq!(error_paths(&config), vec!["profiles.bad.checkpoint_interval"]);
    }
}
