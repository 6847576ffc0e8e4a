//! Request and Response data model
//!
//! A [`Request`] is created by the gateway and travels through the request
//! stream. Exactly one [`Response`] is produced for it once it reaches a
//! terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::cost::CostBreakdown;
use crate::core::providers::{Completion, ModelRoute};
use crate::utils::error::{ErrorDetail, GatewayError};

/// Unique request identifier, generated at the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// What the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Summarize,
    Ask,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Summarize => "summarize",
            RequestKind::Ask => "ask",
        }
    }
}

/// Request lifecycle: `pending -> dispatched -> completed | failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Dispatched,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

/// A document-grounded request as carried on the request stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub kind: RequestKind,
    pub document_id: String,
    /// Required and non-empty iff `kind` is `ask`
    pub question: Option<String>,
    /// Excerpt to use instead of the whole document
    pub selected_text: Option<String>,
    pub model_choice: String,
    pub created_at: DateTime<Utc>,
}

/// Terminal result of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub request_id: RequestId,
    /// `completed` or `failed`
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
    pub latency_ms: u64,
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Retries after the first attempt
    pub retries: u32,
    pub completed_at: DateTime<Utc>,
}

impl Response {
    /// Successful response; token counts and cost come from the same breakdown
    pub fn success(
        request_id: RequestId,
        route: &ModelRoute,
        completion: Completion,
        cost: &CostBreakdown,
        latency_ms: u64,
        retries: u32,
    ) -> Self {
        Self {
            request_id,
            status: RequestStatus::Completed,
            text: Some(completion.text),
            error: None,
            input_tokens: cost.usage.prompt_tokens,
            output_tokens: cost.usage.completion_tokens,
            cost: cost.total_cost,
            latency_ms,
            provider: Some(route.provider.to_string()),
            model: Some(route.model.clone()),
            retries,
            completed_at: Utc::now(),
        }
    }

    /// Failure response; never carries tokens or cost
    pub fn failure(
        request_id: RequestId,
        error: &GatewayError,
        route: Option<&ModelRoute>,
        latency_ms: u64,
        retries: u32,
    ) -> Self {
        Self {
            request_id,
            status: RequestStatus::Failed,
            text: None,
            error: Some(error.detail()),
            input_tokens: 0,
            output_tokens: 0,
            cost: 0.0,
            latency_ms,
            provider: route.map(|r| r.provider.to_string()),
            model: route.map(|r| r.model.clone()),
            retries,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RequestStatus::Completed
    }
}
