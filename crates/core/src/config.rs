//! Runtime configuration for noteweave-core
//!
//! Configuration is stored as `config.toml` inside the knowledge-base
//! directory. Loading never panics on a missing file — callers get
//! [`Config::default`] and a debug log instead, since the watcher should
//! start cleanly on a brand new vault.

pub mod types;

use std::fs;
use std::path::Path;

use crate::error::{NoteweaveError, Result};

pub use types::{Config, EmbeddingProviderKind, CONFIG_FORMAT_VERSION};

impl Config {
    /// Load configuration from a TOML file, validating it afterwards.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration if present, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file found, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Save configuration to a file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| NoteweaveError::io(parent.to_path_buf(), e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| NoteweaveError::config(format!("failed to serialize config: {e}")))?;
        fs::write(path, content).map_err(|e| NoteweaveError::io(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Validate field invariants that `serde` defaults alone can't enforce.
    pub fn validate(&self) -> Result<()> {
        if self.notes_directory.trim().is_empty() {
            return Err(NoteweaveError::config("notes_directory must not be empty"));
        }
        if self.knowledge_base_directory.trim().is_empty() {
            return Err(NoteweaveError::config(
                "knowledge_base_directory must not be empty",
            ));
        }
        if self.chunk_size == 0 {
            return Err(NoteweaveError::config("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(NoteweaveError::config(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(NoteweaveError::config(
                "semantic_threshold must be between 0.0 and 1.0",
            ));
        }
        if self.watcher_queue_capacity == 0 {
            return Err(NoteweaveError::config(
                "watcher_queue_capacity must be greater than 0",
            ));
        }
        if self.embedding_max_retries == 0 {
            return Err(NoteweaveError::config(
                "embedding_max_retries must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CONFIG_FORMAT_VERSION;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.notes_directory, "notes");
        assert_eq!(config.embedding_provider, EmbeddingProviderKind::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.version, config.version);
        assert_eq!(loaded.notes_directory, config.notes_directory);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");

        let config = Config::load_or_default(&path).unwrap();
        assert_eq!(config.notes_directory, Config::default().notes_directory);
    }

    #[test]
    fn test_validate_rejects_empty_notes_directory() {
        let config = Config {
            notes_directory: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlap_ge_chunk_size() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let config = Config {
            semantic_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_remote_provider_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            embedding_provider: EmbeddingProviderKind::Remote,
            embedding_api_key_env: "MY_KEY".to_string(),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.embedding_provider, EmbeddingProviderKind::Remote);
        assert_eq!(loaded.embedding_api_key_env, "MY_KEY");
    }
}
