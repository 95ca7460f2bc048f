//! Local embedding provider.
//!
//! Vendoring a real sentence-embedding model (ONNX/candle weights) is out
//! of reach for this exercise — there's no model asset to ship, and a
//! crate dependency that can't actually load anything would be worse than
//! being explicit about the substitution. This provider implements a
//! deterministic, dependency-light stand-in behind the same
//! [`EmbeddingProvider`] contract: hashed bag-of-words, projected into a
//! fixed-width vector and L2-normalized, computed from
//! [`tokenize_with_stemming`] so that repeated terms across notes still
//! cluster together. CPU work is offloaded via `spawn_blocking` exactly as
//! a real model's inference would be.

use async_trait::async_trait;

use super::{EmbeddingProvider, ProviderInfo};
use crate::error::{NoteweaveError, Result};
use crate::text::tokenize_with_stemming;

/// A local embedding provider with a configurable output width.
pub struct LocalProvider {
    model: String,
    dim: usize,
}

impl LocalProvider {
    pub fn new(model: impl Into<String>, dim: usize) -> Self {
        LocalProvider {
            model: model.into(),
            dim,
        }
    }

    fn embed_sync(text: &str, dim: usize) -> Vec<f32> {
        let mut vector = vec![0f32; dim];
        for token in tokenize_with_stemming(text, true) {
            let bucket = fnv1a(&token) as usize % dim;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.to_string();
        let dim = self.dim;
        tokio::task::spawn_blocking(move || LocalProvider::embed_sync(&text, dim))
            .await
            .map_err(|e| NoteweaveError::embedding("local", e.to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        let dim = self.dim;
        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|t| LocalProvider::embed_sync(t, dim))
                .collect()
        })
        .await
        .map_err(|e| NoteweaveError::embedding("local", e.to_string()))
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "local".to_string(),
            model: self.model.clone(),
            dimension: self.dim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_one_produces_requested_dimension() {
        let provider = LocalProvider::new("bag-of-words-256", 256);
        let vector = provider.embed_one("hello world").await.unwrap();
        assert_eq!(vector.len(), 256);
    }

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let provider = LocalProvider::new("bag-of-words-64", 64);
        let a = provider.embed_one("graph knowledge system").await.unwrap();
        let b = provider.embed_one("graph knowledge system").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_text_embeds_differently() {
        let provider = LocalProvider::new("bag-of-words-64", 64);
        let a = provider.embed_one("graph knowledge system").await.unwrap();
        let b = provider.embed_one("cooking pasta recipe").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn embed_many_matches_embed_one_per_item() {
        let provider = LocalProvider::new("bag-of-words-64", 64);
        let batch = provider
            .embed_many(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        let alpha = provider.embed_one("alpha").await.unwrap();
        assert_eq!(batch[0], alpha);
    }

    #[test]
    fn provider_info_reports_shape() {
        let provider = LocalProvider::new("bag-of-words-256", 256);
        let info = provider.provider_info();
        assert_eq!(info.provider, "local");
        assert_eq!(info.dimension, 256);
    }
}
