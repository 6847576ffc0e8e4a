//! Request stream on Redis Streams
//!
//! Payloads are stored as JSON under a single `payload` field. Expired leases
//! are reclaimed with `XPENDING ... IDLE` + XCLAIM, using the entry's idle
//! time as the lease clock. Requires Redis 6.2 or newer.

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamPendingReply, StreamReadOptions,
    StreamReadReply,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{MessageLog, StreamMessage};
use crate::utils::error::{GatewayError, Result};

const PAYLOAD_FIELD: &str = "payload";

/// XREADGROUP BLOCK would stall the multiplexed connection shared with
/// publishers, so empty reads are retried at this interval instead.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Message log backed by a Redis stream key
pub struct RedisStream<T> {
    conn: ConnectionManager,
    key: String,
    lease: Duration,
    groups: Mutex<HashSet<String>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for RedisStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStream")
            .field("key", &self.key)
            .field("lease", &self.lease)
            .finish()
    }
}

impl<T> RedisStream<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Connect to Redis and bind to the stream `key`
    pub async fn connect(url: &str, key: impl Into<String>, lease: Duration) -> Result<Self> {
        let key = key.into();
        info!(stream = %key, "Connecting request stream to Redis");
        let client = redis::Client::open(url).map_err(GatewayError::Redis)?;
        let mut conn = ConnectionManager::new(client).await?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis stream connection healthy");

        Ok(Self {
            conn,
            key,
            lease,
            groups: Mutex::new(HashSet::new()),
            _payload: PhantomData,
        })
    }

    async fn ensure_group(&self, group: &str) -> Result<()> {
        if self.groups.lock().contains(group) {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> =
            conn.xgroup_create_mkstream(&self.key, group, "0").await;
        match created {
            Ok(()) => info!(stream = %self.key, group, "Created consumer group"),
            Err(e) if e.code() == Some("BUSYGROUP") => {}
            Err(e) => return Err(e.into()),
        }
        self.groups.lock().insert(group.to_string());
        Ok(())
    }

    /// Decode an entry; undecodable entries are acknowledged and dropped so
    /// they cannot be redelivered forever.
    async fn decode(
        &self,
        group: &str,
        entry: &StreamId,
        delivery_count: u32,
    ) -> Result<Option<StreamMessage<T>>> {
        let decoded = entry
            .get::<String>(PAYLOAD_FIELD)
            .ok_or_else(|| "missing payload field".to_string())
            .and_then(|raw| serde_json::from_str::<T>(&raw).map_err(|e| e.to_string()));

        match decoded {
            Ok(payload) => Ok(Some(StreamMessage {
                id: entry.id.clone(),
                payload,
                delivery_count,
            })),
            Err(reason) => {
                warn!(stream = %self.key, id = %entry.id, "Dropping malformed stream entry: {}", reason);
                self.ack(group, &entry.id).await?;
                Ok(None)
            }
        }
    }

    async fn reclaim_expired(
        &self,
        group: &str,
        consumer: &str,
        max: usize,
    ) -> Result<Vec<StreamMessage<T>>> {
        let lease_ms = self.lease.as_millis() as usize;
        let mut conn = self.conn.clone();

        // Only entries idle past the lease, wherever they sit in the PEL
        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.key)
            .arg(group)
            .arg("IDLE")
            .arg(lease_ms)
            .arg("-")
            .arg("+")
            .arg(max)
            .query_async(&mut conn)
            .await?;
        let expired: HashMap<String, u32> = pending
            .ids
            .into_iter()
            .map(|p| (p.id, p.times_delivered as u32))
            .collect();
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&String> = expired.keys().collect();
        // min-idle makes the claim lose to any consumer that got there first
        let claimed: StreamClaimReply = conn
            .xclaim(&self.key, group, consumer, lease_ms, &ids)
            .await?;

        let mut batch = Vec::new();
        for entry in &claimed.ids {
            let deliveries = expired.get(&entry.id).copied().unwrap_or(1) + 1;
            debug!(stream = %self.key, id = %entry.id, consumer, "Lease expired, redelivering");
            if let Some(message) = self.decode(group, entry, deliveries).await? {
                batch.push(message);
            }
        }
        batch.sort_by_key(|m| super::parse_seq(&m.id));
        Ok(batch)
    }

    async fn read_new(
        &self,
        group: &str,
        consumer: &str,
        max: usize,
    ) -> Result<Vec<StreamMessage<T>>> {
        let mut conn = self.conn.clone();
        let options = StreamReadOptions::default().group(group, consumer).count(max);
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[&self.key], &[">"], &options)
            .await?;

        let mut batch = Vec::new();
        for stream_key in reply.map(|r| r.keys).unwrap_or_default() {
            for entry in &stream_key.ids {
                if let Some(message) = self.decode(group, entry, 1).await? {
                    batch.push(message);
                }
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl<T> MessageLog<T> for RedisStream<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn publish(&self, payload: &T) -> Result<String> {
        let json = serde_json::to_string(payload)?;
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd(&self.key, "*", &[(PAYLOAD_FIELD, json)])
            .await?;
        debug!(stream = %self.key, id = %id, "Published to stream");
        Ok(id)
    }

    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        max: usize,
        block: Duration,
    ) -> Result<Vec<StreamMessage<T>>> {
        let max = max.max(1);
        self.ensure_group(group).await?;
        let deadline = Instant::now() + block;

        loop {
            let mut batch = self.reclaim_expired(group, consumer, max).await?;
            if batch.len() < max {
                batch.extend(self.read_new(group, consumer, max - batch.len()).await?);
            }
            if !batch.is_empty() || Instant::now() >= deadline {
                return Ok(batch);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn ack(&self, group: &str, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let acked: usize = conn.xack(&self.key, group, &[id]).await?;
        Ok(acked > 0)
    }

    async fn pending_count(&self, group: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<StreamPendingReply> = conn.xpending(&self.key, group).await;
        match reply {
            Ok(reply) => Ok(reply.count()),
            // Group not created yet
            Err(e) if e.code() == Some("NOGROUP") => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        Ok(conn.xlen(&self.key).await?)
    }
}
