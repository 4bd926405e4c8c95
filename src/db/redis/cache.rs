use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use redis::RedisResult;
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, OnceCell};

use crate::error::AppError;
use crate::error::AppResult;

/// Writes sent to Redis in one pipeline at most
const MAX_WRITES_PER_FLUSH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Embedding of one prompt under one model
    PromptEmbedding { model: String, prompt: String },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::PromptEmbedding { model, prompt } => {
                let digest = Sha256::digest(prompt.as_bytes());
                write!(f, "emb:{}:", model.to_lowercase())?;
                for byte in digest.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// One lazily opened connection shared by readers and the writer.
///
/// Every round-trip, including the initial connect, is bounded by `timeout`.
/// A failed connect leaves the cell empty so the next call tries again.
struct RedisLink {
    client: Client,
    manager: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl RedisLink {
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        let result = tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                AppError::Internal(format!(
                    "Redis {} timed out after {}ms",
                    operation,
                    self.timeout.as_millis()
                ))
            })?;
        Ok(result?)
    }

    async fn connection(&self) -> AppResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| self.bounded("connect", self.client.get_connection_manager()))
            .await?;
        Ok(manager.clone())
    }
}

#[derive(Clone)]
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache backed by Redis.
///
/// Reads go straight to Redis and give up after the configured timeout.
/// Writes are queued to a background task that pipelines whatever has
/// accumulated, so a request never waits on a write.
#[derive(Clone)]
pub struct Cache {
    link: Arc<RedisLink>,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer after it has flushed the queue
pub struct CacheWriterHandle {
    shutdown_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            tracing::warn!("Cache writer already stopped");
            return;
        }
        let _ = self.done_rx.await;
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Creates the cache and spawns its writer on the current runtime.
    ///
    /// No connection is opened until the first read or flush.
    pub fn new(redis_client: Client, timeout: Duration) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        let link = Arc::new(RedisLink {
            client: redis_client,
            manager: OnceCell::new(),
            timeout,
        });
        let writer = CacheWriter { link: link.clone() };
        tokio::spawn(async move {
            writer.run(write_rx, shutdown_rx).await;
            let _ = done_tx.send(());
        });

        let cache = Self { link, write_tx };
        (
            cache,
            CacheWriterHandle {
                shutdown_tx,
                done_rx,
            },
        )
    }

    /// Retrieves and deserializes a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.link.connection().await?;
        let cached: Option<String> = self
            .link
            .bounded("read", conn.get(key.to_string()))
            .await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a write without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };
        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer has stopped, dropping write");
        }
    }
}

struct CacheWriter {
    link: Arc<RedisLink>,
}

impl CacheWriter {
    async fn run(
        self,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                received = write_rx.recv() => match received {
                    Some(first) => {
                        let mut batch = vec![first];
                        while batch.len() < MAX_WRITES_PER_FLUSH {
                            match write_rx.try_recv() {
                                Ok(write) => batch.push(write),
                                Err(_) => break,
                            }
                        }
                        self.flush(batch).await;
                    }
                    None => break,
                },
                _ = &mut shutdown_rx => {
                    write_rx.close();
                    let mut remaining = Vec::new();
                    while let Some(write) = write_rx.recv().await {
                        remaining.push(write);
                    }
                    tracing::info!(pending = remaining.len(), "Flushing cache writes before shutdown");
                    for chunk in remaining.chunks(MAX_WRITES_PER_FLUSH) {
                        self.flush(chunk.to_vec()).await;
                    }
                    break;
                }
            }
        }
    }

    async fn flush(&self, batch: Vec<PendingWrite>) {
        let count = batch.len();
        if let Err(e) = self.write_batch(batch).await {
            tracing::warn!(error = %e, writes = count, "Failed to write to Redis cache");
        }
    }

    async fn write_batch(&self, batch: Vec<PendingWrite>) -> AppResult<()> {
        let mut conn = self.link.connection().await?;

        let mut pipe = redis::pipe();
        for write in batch {
            pipe.set_ex(write.key, write.value, write.ttl).ignore();
        }
        let _: () = self.link.bounded("write", pipe.query_async(&mut conn)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embedding_key_is_hashed() {
        let key = CacheKey::PromptEmbedding {
            model: "all-MiniLM-L6-v2".to_string(),
            prompt: "sci-fi movie with space exploration".to_string(),
        };
        let rendered = key.to_string();

        assert!(rendered.starts_with("emb:all-minilm-l6-v2:"));
        assert_eq!(rendered.len(), "emb:all-minilm-l6-v2:".len() + 64);
        assert!(!rendered.contains("space"));
    }

    #[test]
    fn test_prompt_embedding_key_distinguishes_prompts() {
        let a = CacheKey::PromptEmbedding {
            model: "m".to_string(),
            prompt: "heist".to_string(),
        };
        let b = CacheKey::PromptEmbedding {
            model: "m".to_string(),
            prompt: "Heist".to_string(),
        };
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_prompt_embedding_key_distinguishes_models() {
        let a = CacheKey::PromptEmbedding {
            model: "all-MiniLM-L6-v2".to_string(),
            prompt: "heist".to_string(),
        };
        let b = CacheKey::PromptEmbedding {
            model: "bge-small-en-v1.5".to_string(),
            prompt: "heist".to_string(),
        };
        assert_ne!(a.to_string(), b.to_string());
    }

    /// Accepts connections and never answers them
    async fn silent_redis() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("redis://{}", addr)
    }

    #[tokio::test]
    async fn test_read_from_silent_redis_times_out() {
        let client = create_redis_client(&silent_redis().await).unwrap();
        let (cache, _handle) = Cache::new(client, Duration::from_millis(100));

        let key = CacheKey::PromptEmbedding {
            model: "m".to_string(),
            prompt: "never answered".to_string(),
        };
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            cache.get_from_cache::<Vec<f32>>(&key),
        )
        .await
        .expect("cache read should give up on its own");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_with_silent_redis_completes() {
        let client = create_redis_client(&silent_redis().await).unwrap();
        let (cache, handle) = Cache::new(client, Duration::from_millis(100));

        let key = CacheKey::PromptEmbedding {
            model: "m".to_string(),
            prompt: "stuck write".to_string(),
        };
        cache.set_in_background(&key, &vec![0.5f32], 60);

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("shutdown should not wait on a silent server");
    }

    #[tokio::test]
    async fn test_shutdown_with_unreachable_redis_completes() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client, Duration::from_millis(250));

        let key = CacheKey::PromptEmbedding {
            model: "m".to_string(),
            prompt: "lost write".to_string(),
        };
        cache.set_in_background(&key, &vec![0.5f32], 60);

        handle.shutdown().await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone(), Duration::from_secs(2));

        let key = CacheKey::PromptEmbedding {
            model: "test".to_string(),
            prompt: "test_async_write".to_string(),
        };
        let value = vec![0.25f32, -0.5];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;

        let retrieved: Option<Vec<f32>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
