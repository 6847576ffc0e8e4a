//! In-process request stream

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use super::{MessageLog, StreamMessage, parse_seq};
use crate::utils::error::Result;

#[derive(Debug)]
struct PendingEntry {
    consumer: String,
    deadline: Instant,
    deliveries: u32,
}

#[derive(Debug)]
struct GroupState {
    next_seq: u64,
    pending: BTreeMap<u64, PendingEntry>,
}

impl GroupState {
    /// Lowest sequence this group may still need
    fn floor(&self) -> u64 {
        self.pending
            .keys()
            .next()
            .copied()
            .unwrap_or(self.next_seq)
            .min(self.next_seq)
    }
}

#[derive(Debug)]
struct Inner<T> {
    /// Sequence of `messages[0]`
    base_seq: u64,
    messages: VecDeque<T>,
    groups: HashMap<String, GroupState>,
}

/// Message log held in memory. Messages every group has acknowledged are
/// trimmed; nothing survives a restart.
#[derive(Debug)]
pub struct InMemoryStream<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    lease: Duration,
}

impl<T> InMemoryStream<T> {
    /// Create an empty log with the given redelivery lease
    pub fn new(lease: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                base_seq: 1,
                messages: VecDeque::new(),
                groups: HashMap::new(),
            }),
            notify: Notify::new(),
            lease,
        }
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    fn format_id(seq: u64) -> String {
        format!("{}-0", seq)
    }
}

impl<T: Clone> InMemoryStream<T> {
    /// Take what is available for `consumer`; also reports the earliest
    /// lease deadline so the caller knows when to look again.
    fn take(
        &self,
        group: &str,
        consumer: &str,
        max: usize,
    ) -> (Vec<StreamMessage<T>>, Option<Instant>) {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let Inner {
            base_seq,
            messages,
            groups,
        } = &mut *guard;
        let base = *base_seq;
        let state = groups.entry(group.to_string()).or_insert_with(|| GroupState {
            next_seq: base,
            pending: BTreeMap::new(),
        });

        let mut batch = Vec::new();

        for (seq, entry) in state.pending.iter_mut() {
            if batch.len() >= max {
                break;
            }
            if entry.deadline > now {
                continue;
            }
            let Some(payload) = messages.get((seq - base) as usize) else {
                continue;
            };
            debug!(
                group,
                from = %entry.consumer,
                to = consumer,
                seq,
                "Lease expired, redelivering"
            );
            entry.consumer = consumer.to_string();
            entry.deadline = now + self.lease;
            entry.deliveries += 1;
            batch.push(StreamMessage {
                id: Self::format_id(*seq),
                payload: payload.clone(),
                delivery_count: entry.deliveries,
            });
        }

        while batch.len() < max {
            let seq = state.next_seq;
            let Some(payload) = messages.get((seq - base) as usize) else {
                break;
            };
            state.next_seq += 1;
            state.pending.insert(
                seq,
                PendingEntry {
                    consumer: consumer.to_string(),
                    deadline: now + self.lease,
                    deliveries: 1,
                },
            );
            batch.push(StreamMessage {
                id: Self::format_id(seq),
                payload: payload.clone(),
                delivery_count: 1,
            });
        }

        let next_expiry = state.pending.values().map(|e| e.deadline).min();
        (batch, next_expiry)
    }

    fn trim(inner: &mut Inner<T>) {
        let Some(floor) = inner.groups.values().map(GroupState::floor).min() else {
            return;
        };
        while inner.base_seq < floor && inner.messages.pop_front().is_some() {
            inner.base_seq += 1;
        }
    }
}

#[async_trait]
impl<T> MessageLog<T> for InMemoryStream<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    async fn publish(&self, payload: &T) -> Result<String> {
        let id = {
            let mut inner = self.inner.lock();
            inner.messages.push_back(payload.clone());
            Self::format_id(inner.base_seq + inner.messages.len() as u64 - 1)
        };
        self.notify.notify_waiters();
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
        let deadline = Instant::now() + block;

        loop {
            // Registered before checking so a publish in between is not missed
            let notified = self.notify.notified();

            let (batch, next_expiry) = self.take(group, consumer, max);
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(batch);
            }
            let wake_at = next_expiry.map_or(deadline, |expiry| expiry.min(deadline));

            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn ack(&self, group: &str, id: &str) -> Result<bool> {
        let Some(seq) = parse_seq(id) else {
            return Ok(false);
        };
        let mut inner = self.inner.lock();
        let acked = inner
            .groups
            .get_mut(group)
            .and_then(|state| state.pending.remove(&seq))
            .is_some();
        if acked {
            Self::trim(&mut inner);
        }
        Ok(acked)
    }

    async fn pending_count(&self, group: &str) -> Result<usize> {
        Ok(self
            .inner
            .lock()
            .groups
            .get(group)
            .map_or(0, |state| state.pending.len()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.lock().messages.len())
    }
}
