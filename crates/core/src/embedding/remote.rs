//! Remote embedding provider: batched HTTPS calls to an OpenAI-compatible
//! embeddings endpoint, with jittered exponential backoff on 429/5xx.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{EmbeddingProvider, ProviderInfo};
use crate::error::{NoteweaveError, Result};

pub struct RemoteProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    dim: usize,
    max_retries: u32,
}

impl RemoteProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dim: usize,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NoteweaveError::embedding("remote", e.to_string()))?;

        Ok(RemoteProvider {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            dim,
            max_retries,
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct Req<'a> {
            input: &'a [String],
            model: &'a str,
        }
        #[derive(Deserialize)]
        struct RespItem {
            embedding: Vec<f32>,
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<RespItem>,
        }

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(format!("{}/embeddings", self.api_base))
                .bearer_auth(&self.api_key)
                .json(&Req {
                    input: texts,
                    model: &self.model,
                })
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let body: Resp = resp
                        .json()
                        .await
                        .map_err(|e| NoteweaveError::embedding("remote", e.to_string()))?;
                    return Ok(body.data.into_iter().map(|d| d.embedding).collect());
                }
                Ok(resp) if is_retryable(resp.status()) && attempt < self.max_retries => {
                    attempt += 1;
                    backoff_sleep(attempt).await;
                }
                Ok(resp) => {
                    let status = resp.status();
                    return Err(NoteweaveError::embedding(
                        "remote",
                        format!("request failed with status {status}"),
                    ));
                }
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(error = %err, attempt, "retrying remote embedding request");
                    backoff_sleep(attempt).await;
                }
                Err(err) => {
                    return Err(NoteweaveError::embedding("remote", err.to_string()));
                }
            }
        }
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn backoff_sleep(attempt: u32) {
    let base_ms = 200u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
    let jitter_ms = rand::thread_rng().gen_range(0..=base_ms / 2 + 1);
    tokio::time::sleep(Duration::from_millis(base_ms + jitter_ms)).await;
}

#[async_trait]
impl EmbeddingProvider for RemoteProvider {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.request_batch(&[text.to_string()]).await?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| NoteweaveError::embedding("remote", "empty response"))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.request_batch(texts).await
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "remote".to_string(),
            model: self.model.clone(),
            dimension: self.dim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_include_429_and_5xx() {
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable(reqwest::StatusCode::BAD_REQUEST));
        assert!(!is_retryable(reqwest::StatusCode::OK));
    }

    #[test]
    fn provider_info_reports_remote() {
        let provider = RemoteProvider::new(
            "https://api.example.com/v1",
            "key",
            "text-embedding-3-small",
            1536,
            Duration::from_secs(30),
            3,
        )
        .unwrap();
        let info = provider.provider_info();
        assert_eq!(info.provider, "remote");
        assert_eq!(info.dimension, 1536);
    }
}
