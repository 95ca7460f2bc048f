//! Embedding providers (C5): text -> vector, abstracted over a local,
//! dependency-light backend and a remote HTTPS one.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use local::LocalProvider;
pub use remote::RemoteProvider;

/// Introspection shape surfaced to callers and to the vector store, which
/// uses `(provider, model)` to name collections — switching either one
/// MUST select a different collection (`spec.md` §4.5).
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    pub dimension: usize,
}

/// Abstracts over a backend that turns text into fixed-width vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many pieces of text; a provider that batches server-side
    /// (the remote provider) can do meaningfully better than looping
    /// `embed_one`.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output vector width.
    fn dim(&self) -> usize;

    fn provider_info(&self) -> ProviderInfo;
}
