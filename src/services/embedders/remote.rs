//! Hosted feature-extraction embedder
//!
//! Posts `{"inputs": ...}` to an inference endpoint (Hugging Face's
//! feature-extraction pipeline by default). A 503 means the hosted model is
//! still loading: the call waits a fixed backoff and retries exactly once
//! before failing. Every call is bounded by the client timeout.
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{json, Value};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        embedding::{ensure_dimensions, flatten_json},
        Embedding,
    },
    services::embedders::Embedder,
};

/// Construction parameters for [`RemoteEmbedder`]
#[derive(Debug, Clone)]
pub struct RemoteEmbedderOptions {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub dimensions: usize,
    pub timeout: Duration,
    pub cold_start_backoff: Duration,
}

impl RemoteEmbedderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.embedding_api_url.clone(),
            api_key: config
                .huggingface_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model_name: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            timeout: config.embedding_timeout(),
            cold_start_backoff: config.cold_start_backoff(),
        }
    }
}

#[derive(Clone)]
pub struct RemoteEmbedder {
    http_client: HttpClient,
    options: RemoteEmbedderOptions,
}

impl RemoteEmbedder {
    pub fn new(options: RemoteEmbedderOptions) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(options.timeout).build()?;
        Ok(Self {
            http_client,
            options,
        })
    }

    async fn send(&self, body: &Value) -> AppResult<reqwest::Response> {
        let mut request = self.http_client.post(&self.options.api_url).json(body);
        if let Some(key) = &self.options.api_key {
            request = request.bearer_auth(key);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::EmbeddingProvider(format!(
                    "Embedding request timed out after {:?}",
                    self.options.timeout
                ))
            } else {
                AppError::EmbeddingProvider(format!("Embedding request failed: {}", e))
            }
        })
    }

    /// Sends the payload, retrying once on a cold-start response
    async fn post_inputs(&self, inputs: Value) -> AppResult<Value> {
        let body = json!({ "inputs": inputs });

        let mut response = self.send(&body).await?;
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            tracing::info!(
                backoff_ms = self.options.cold_start_backoff.as_millis() as u64,
                "Embedding model is loading, retrying once"
            );
            tokio::time::sleep(self.options.cold_start_backoff).await;
            response = self.send(&body).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingProvider(format!(
                "Embedding API returned status {}: {}",
                status, body
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            AppError::EmbeddingProvider(format!("Failed to parse embedding response: {}", e))
        })
    }

    fn to_vector(&self, value: &Value) -> AppResult<Embedding> {
        let vector = flatten_json(value)?;
        ensure_dimensions(&vector, self.options.dimensions)?;
        Ok(vector)
    }
}

#[async_trait::async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Embedding> {
        let value = self.post_inputs(json!(text)).await?;
        self.to_vector(&value)
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let value = self.post_inputs(json!(texts)).await?;
        let rows = match value {
            Value::Array(rows) if rows.len() == texts.len() && rows.iter().all(Value::is_array) => {
                rows
            }
            // A single input may come back as a bare vector
            other if texts.len() == 1 => vec![other],
            other => {
                return Err(AppError::EmbeddingProvider(format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    other.as_array().map_or(0, Vec::len)
                )))
            }
        };

        rows.iter().map(|row| self.to_vector(row)).collect()
    }

    fn dimensions(&self) -> usize {
        self.options.dimensions
    }

    fn model_id(&self) -> String {
        self.options.model_name.clone()
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(dimensions: usize) -> RemoteEmbedder {
        RemoteEmbedder::new(RemoteEmbedderOptions {
            api_url: "http://test.local".to_string(),
            api_key: None,
            model_name: "all-MiniLM-L6-v2".to_string(),
            dimensions,
            timeout: Duration::from_secs(1),
            cold_start_backoff: Duration::from_millis(1),
        })
        .unwrap()
    }

    #[test]
    fn test_to_vector_flattens_nested() {
        let value = json!([[0.1, 0.2, 0.3]]);
        assert_eq!(embedder(3).to_vector(&value).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_to_vector_dimension_mismatch() {
        let value = json!([0.1, 0.2]);
        assert!(matches!(
            embedder(3).to_vector(&value),
            Err(AppError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_options_drop_blank_api_key() {
        let mut config = Config::from_iter(Vec::new()).unwrap();
        config.huggingface_api_key = Some("  ".to_string());
        assert!(RemoteEmbedderOptions::from_config(&config).api_key.is_none());
    }
}
