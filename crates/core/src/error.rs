//! Error types for noteweave-core
//!
//! Variants are the semantic error *kinds* the spec defines (IoError,
//! ParseError, EmbeddingError, VectorStoreError, InvariantViolation,
//! WatcherOverflow), not a grab-bag of library exception wrappers. Every
//! fallible public operation returns [`Result`].

pub mod macros;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during noteweave operations.
#[derive(Error, Debug)]
pub enum NoteweaveError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error{}: {message}", path.as_ref().map(|p| format!(" in {p:?}")).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("embedding provider {provider} failed: {message}")]
    Embedding { provider: String, message: String },

    #[error("vector store error: {message}")]
    VectorStore { message: String },

    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },

    #[error("watcher queue overflowed, dropped event for {path:?}")]
    WatcherOverflow { path: PathBuf },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("note not found: {id}")]
    NoteNotFound { id: String },

    #[error("{0}")]
    Other(String),
}

impl NoteweaveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NoteweaveError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        NoteweaveError::Parse {
            path,
            message: message.into(),
        }
    }

    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        NoteweaveError::Embedding {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn vector_store(message: impl Into<String>) -> Self {
        NoteweaveError::VectorStore {
            message: message.into(),
        }
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        NoteweaveError::InvariantViolation {
            detail: detail.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        NoteweaveError::Config {
            message: message.into(),
        }
    }

    /// Machine-readable tag used in sync reports and structured logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            NoteweaveError::Io { .. } => "io_error",
            NoteweaveError::Parse { .. } => "parse_error",
            NoteweaveError::Embedding { .. } => "embedding_error",
            NoteweaveError::VectorStore { .. } => "vector_store_error",
            NoteweaveError::InvariantViolation { .. } => "invariant_violation",
            NoteweaveError::WatcherOverflow { .. } => "watcher_overflow",
            NoteweaveError::Config { .. } => "config_error",
            NoteweaveError::NoteNotFound { .. } => "note_not_found",
            NoteweaveError::Other(_) => "other",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<serde_json::Error> for NoteweaveError {
    fn from(err: serde_json::Error) -> Self {
        NoteweaveError::Other(format!("json error: {err}"))
    }
}

impl From<serde_yaml::Error> for NoteweaveError {
    fn from(err: serde_yaml::Error) -> Self {
        NoteweaveError::parse(None, err.to_string())
    }
}

impl From<toml::de::Error> for NoteweaveError {
    fn from(err: toml::de::Error) -> Self {
        NoteweaveError::config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NoteweaveError>;
