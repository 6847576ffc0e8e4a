//! Response channel
//!
//! Correlates terminal Responses back to callers by request id. The store
//! keeps one record per request, accepts the first terminal Response for it
//! and ignores any later one, and wakes every waiter when it lands. Records
//! are evicted once they have been terminal for longer than the retention TTL,
//! whether or not a caller claimed them.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::core::requests::{Request, RequestId, RequestKind, RequestStatus, Response};
use crate::utils::error::{GatewayError, Result};

#[derive(Debug)]
struct Record {
    kind: Option<RequestKind>,
    model_choice: Option<String>,
    created_at: DateTime<Utc>,
    status: RequestStatus,
    claimed: bool,
    terminal_at: Option<Instant>,
    tx: watch::Sender<Option<Response>>,
}

impl Record {
    fn new(request: Option<&Request>, status: RequestStatus) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            kind: request.map(|r| r.kind),
            model_choice: request.map(|r| r.model_choice.clone()),
            created_at: request.map(|r| r.created_at).unwrap_or_else(Utc::now),
            status,
            claimed: false,
            terminal_at: None,
            tx,
        }
    }
}

/// Point-in-time view of a request, for polling
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub request_id: RequestId,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RequestKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_choice: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
}

/// Record counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub pending: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Callback map from request id to its eventual Response
#[derive(Debug)]
pub struct ResponseStore {
    records: DashMap<RequestId, Record>,
    retention_ttl: Duration,
}

impl ResponseStore {
    pub fn new(retention_ttl: Duration) -> Self {
        Self {
            records: DashMap::new(),
            retention_ttl,
        }
    }

    /// Track a newly submitted request as `pending`
    pub fn register(&self, request: &Request) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.records.entry(request.id.clone()) {
            Entry::Occupied(_) => Err(GatewayError::internal(format!(
                "Request {} is already registered",
                request.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Record::new(Some(request), RequestStatus::Pending));
                Ok(())
            }
        }
    }

    /// Drop a request that never made it onto the stream
    pub fn discard(&self, id: &RequestId) {
        self.records.remove(id);
    }

    /// `pending -> dispatched`; other states are left alone
    pub fn mark_dispatched(&self, id: &RequestId) {
        if let Some(mut record) = self.records.get_mut(id) {
            if record.status == RequestStatus::Pending {
                record.status = RequestStatus::Dispatched;
            }
        }
    }

    /// Record a terminal Response. Returns `false` when the request already
    /// had one, in which case the new Response is dropped.
    pub fn complete(&self, response: Response) -> bool {
        let mut record = self
            .records
            .entry(response.request_id.clone())
            .or_insert_with(|| Record::new(None, RequestStatus::Dispatched));

        if record.status.is_terminal() {
            warn!(
                request_id = %response.request_id,
                "Ignoring duplicate terminal response"
            );
            return false;
        }

        record.status = response.status;
        record.terminal_at = Some(Instant::now());
        debug!(request_id = %response.request_id, status = ?response.status, "Response recorded");
        record.tx.send_replace(Some(response));
        true
    }

    /// Whether the request already has its terminal Response
    pub fn is_terminal(&self, id: &RequestId) -> bool {
        self.records
            .get(id)
            .map(|r| r.status.is_terminal())
            .unwrap_or(false)
    }

    pub fn status(&self, id: &RequestId) -> Option<RequestStatus> {
        self.records.get(id).map(|r| r.status)
    }

    /// Current view of a request, Response included once terminal
    pub fn snapshot(&self, id: &RequestId) -> Option<RequestSnapshot> {
        self.records.get(id).map(|record| RequestSnapshot {
            request_id: id.clone(),
            status: record.status,
            kind: record.kind,
            model_choice: record.model_choice.clone(),
            created_at: record.created_at,
            response: record.tx.borrow().clone(),
        })
    }

    /// Wait for the request's Response.
    ///
    /// Fails with `NotFound` for unknown ids and `Timeout` once `timeout`
    /// elapses; the request itself keeps running either way.
    pub async fn wait(&self, id: &RequestId, timeout: Duration) -> Result<Response> {
        let mut rx = self
            .records
            .get(id)
            .map(|record| record.tx.subscribe())
            .ok_or_else(|| GatewayError::NotFound(format!("Request {} not found", id)))?;

        let response = match tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await {
            Ok(Ok(value)) => value.clone(),
            Ok(Err(_)) => {
                return Err(GatewayError::NotFound(format!(
                    "Request {} was evicted",
                    id
                )));
            }
            Err(_) => {
                return Err(GatewayError::Timeout(format!(
                    "No response for request {} within {:?}",
                    id, timeout
                )));
            }
        };

        if let Some(mut record) = self.records.get_mut(id) {
            record.claimed = true;
        }

        response.ok_or_else(|| GatewayError::internal("Terminal record without a response"))
    }

    /// Whether a caller has claimed the Response
    pub fn is_claimed(&self, id: &RequestId) -> bool {
        self.records.get(id).map(|r| r.claimed).unwrap_or(false)
    }

    /// Evict records that have been terminal for longer than the retention TTL
    pub fn evict_expired(&self) -> usize {
        let before = self.records.len();
        let ttl = self.retention_ttl;
        self.records.retain(|id, record| {
            let keep = record
                .terminal_at
                .map(|at| at.elapsed() < ttl)
                .unwrap_or(true);
            if !keep && !record.claimed {
                debug!(request_id = %id, "Discarding unclaimed response");
            }
            keep
        });
        before.saturating_sub(self.records.len())
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for record in self.records.iter() {
            match record.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Dispatched => stats.dispatched += 1,
                RequestStatus::Completed => stats.completed += 1,
                RequestStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
