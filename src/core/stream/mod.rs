//! Request stream
//!
//! An ordered, at-least-once message log with consumer-group delivery. Each
//! message published is handed to exactly one live consumer of a group at a
//! time; a consumer that does not acknowledge within the lease loses it to
//! the next reader of the group.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryStream;
#[cfg(feature = "redis")]
pub use self::redis::RedisStream;

use async_trait::async_trait;
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;

use crate::utils::error::Result;

/// Envelope around one payload on the log
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage<T> {
    /// Monotonically increasing id, `"<seq>-<n>"`
    pub id: String,
    pub payload: T,
    /// 1 on first delivery, incremented on every redelivery
    pub delivery_count: u32,
}

impl<T> StreamMessage<T> {
    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }
}

/// Durable ordered log with consumer groups
#[async_trait]
pub trait MessageLog<T>: Send + Sync + std::fmt::Debug
where
    T: Send + Sync + 'static,
{
    /// Append a payload; returns its id
    async fn publish(&self, payload: &T) -> Result<String>;

    /// Read up to `max` messages for `consumer` in `group`, waiting up to
    /// `block` when nothing is available. Messages whose lease expired
    /// unacknowledged are handed out again before new ones.
    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        max: usize,
        block: Duration,
    ) -> Result<Vec<StreamMessage<T>>>;

    /// Acknowledge a message; returns `false` if it was not pending
    async fn ack(&self, group: &str, id: &str) -> Result<bool>;

    /// Delivered but unacknowledged messages in `group`
    async fn pending_count(&self, group: &str) -> Result<usize>;

    /// Messages retained in the log
    async fn len(&self) -> Result<usize>;
}

/// Acknowledges one delivered message
#[derive(Debug)]
pub struct AckHandle<T: Send + Sync + 'static> {
    log: Arc<dyn MessageLog<T>>,
    group: String,
    id: String,
}

impl<T: Send + Sync + 'static> AckHandle<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the redelivery risk for this message
    pub async fn acknowledge(self) -> Result<bool> {
        self.log.ack(&self.group, &self.id).await
    }
}

/// A message handed to a consumer together with its ack handle
#[derive(Debug)]
pub struct Delivery<T: Send + Sync + 'static> {
    pub message: StreamMessage<T>,
    pub ack: AckHandle<T>,
}

/// Lazy sequence of deliveries for one consumer of a group.
///
/// Reads one message at a time, so a consumer that acknowledges before
/// pulling the next item never holds more than one unacknowledged message.
pub fn subscribe<T>(
    log: Arc<dyn MessageLog<T>>,
    group: impl Into<String>,
    consumer: impl Into<String>,
    block: Duration,
) -> impl Stream<Item = Result<Delivery<T>>>
where
    T: Send + Sync + 'static,
{
    let group = group.into();
    let consumer = consumer.into();
    async_stream::stream! {
        loop {
            match log.read_group(&group, &consumer, 1, block).await {
                Ok(batch) => {
                    for message in batch {
                        let ack = AckHandle {
                            log: Arc::clone(&log),
                            group: group.clone(),
                            id: message.id.clone(),
                        };
                        yield Ok(Delivery { message, ack });
                    }
                }
                Err(e) => yield Err(e),
            }
        }
    }
}

pub(crate) fn parse_seq(id: &str) -> Option<u64> {
    id.split('-').next()?.parse().ok()
}
