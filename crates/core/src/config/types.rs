//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Which embedding provider to use for semantic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic hashed bag-of-words, computed locally, no network.
    #[default]
    Local,
    /// Batched HTTPS calls to an OpenAI-compatible embeddings endpoint.
    Remote,
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProviderKind::Local => write!(f, "local"),
            EmbeddingProviderKind::Remote => write!(f, "remote"),
        }
    }
}

/// Top-level configuration for a noteweave instance.
///
/// Every field is explicit and enumerated; there is no free-form option
/// bag. Unset fields fall back to documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config format version for compatibility checking
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root directory the watcher scans for `.md`/`.markdown` notes.
    #[serde(default = "default_notes_directory")]
    pub notes_directory: String,

    /// Directory holding persisted graph/cache/vector state.
    #[serde(default = "default_knowledge_base_directory")]
    pub knowledge_base_directory: String,

    /// Which embedding backend to construct.
    #[serde(default)]
    pub embedding_provider: EmbeddingProviderKind,

    /// Model identifier passed to the embedding provider.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Debounce window the file watcher coalesces change bursts over.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Bounded channel capacity between the watcher thread and the
    /// async processing task.
    #[serde(default = "default_watcher_queue_capacity")]
    pub watcher_queue_capacity: usize,

    /// Minimum cosine similarity for a semantic search hit to be returned.
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f32,

    /// Maximum tokens per chunk when splitting a note body for embedding.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Token overlap between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Default case-sensitivity for content search when a query doesn't
    /// specify one explicitly.
    #[serde(default)]
    pub case_sensitive_default: bool,

    /// Base URL of the remote embeddings endpoint (remote provider only).
    #[serde(default = "default_embedding_api_base")]
    pub embedding_api_base: String,

    /// Name of the environment variable holding the remote API key. The
    /// key itself is never written to this file.
    #[serde(default = "default_embedding_api_key_env")]
    pub embedding_api_key_env: String,

    /// Per-request timeout for the remote embedding client.
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,

    /// Maximum retry attempts on 429/5xx before surfacing an error.
    #[serde(default = "default_embedding_max_retries")]
    pub embedding_max_retries: u32,
}

fn default_version() -> u32 {
    CONFIG_FORMAT_VERSION
}

fn default_notes_directory() -> String {
    "notes".to_string()
}

fn default_knowledge_base_directory() -> String {
    ".knowledge_base".to_string()
}

fn default_embedding_model() -> String {
    "bag-of-words-256".to_string()
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_watcher_queue_capacity() -> usize {
    1024
}

fn default_semantic_threshold() -> f32 {
    0.3
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    64
}

fn default_embedding_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_api_key_env() -> String {
    "EMBEDDING_API_KEY".to_string()
}

fn default_embedding_timeout_ms() -> u64 {
    30_000
}

fn default_embedding_max_retries() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: CONFIG_FORMAT_VERSION,
            notes_directory: default_notes_directory(),
            knowledge_base_directory: default_knowledge_base_directory(),
            embedding_provider: EmbeddingProviderKind::default(),
            embedding_model: default_embedding_model(),
            debounce_ms: default_debounce_ms(),
            watcher_queue_capacity: default_watcher_queue_capacity(),
            semantic_threshold: default_semantic_threshold(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            case_sensitive_default: false,
            embedding_api_base: default_embedding_api_base(),
            embedding_api_key_env: default_embedding_api_key_env(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            embedding_max_retries: default_embedding_max_retries(),
        }
    }
}
