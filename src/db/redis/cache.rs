use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{error::AppResult, mapping::TaxonomyVariant};

/// Generated blurbs are reused for a day
pub const SUGGESTION_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Generated blurb for a listing of the given variant
    Suggestion(TaxonomyVariant, Uuid),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Suggestion(variant, id) => write!(f, "suggestion:{}:{}", variant, id),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache for generated suggestions.
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// slow or unavailable Redis never delays a response. Every failure is
/// logged and treated as a miss.
#[derive(Clone)]
pub struct Cache {
    client: Client,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer after draining queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Spawns the writer task; must be called inside a tokio runtime
    pub fn new(client: Client) -> (Self, CacheWriterHandle) {
        let (writes, queue) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(Self::run_writer(client.clone(), queue, shutdown_rx));

        (Self { client, writes }, CacheWriterHandle { shutdown_tx })
    }

    async fn run_writer(
        client: Client,
        mut queue: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(write) = queue.recv() => Self::flush_one(&client, write).await,
                _ = shutdown_rx.recv() => {
                    queue.close();
                    while let Some(write) = queue.recv().await {
                        Self::flush_one(&client, write).await;
                    }
                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn flush_one(client: &Client, write: PendingWrite) {
        if let Err(e) = Self::set_ex(client, &write).await {
            tracing::warn!(error = %e, key = %write.key, "Failed to write to Redis cache");
        }
    }

    async fn set_ex(client: &Client, write: &PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(&write.key, &write.value, write.ttl).await?;
        Ok(())
    }

    async fn get_raw(&self, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    /// Cached text for `key`, or `None` on a miss or any Redis error
    pub async fn get_text(&self, key: &CacheKey) -> Option<String> {
        match self.get_raw(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Redis read failed, treating as miss");
                None
            }
        }
    }

    /// Queues a write without waiting for it
    pub fn put_text_in_background(&self, key: &CacheKey, value: &str, ttl: u64) {
        let write = PendingWrite {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        };

        if let Err(e) = self.writes.send(write) {
            tracing::error!(error = %e, "Cache writer is gone, dropping write");
        }
    }
}
