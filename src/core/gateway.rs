//! Request gateway
//!
//! The request-facing boundary. `submit` validates a request, registers it
//! as `pending` and puts exactly one message on the request stream;
//! `await_response` only observes the outcome and never owns execution.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::core::correlation::{RequestSnapshot, ResponseStore};
use crate::core::cost::PricingTable;
use crate::core::documents::DocumentStore;
use crate::core::providers::ProviderRegistry;
use crate::core::requests::{Request, RequestId, RequestKind, Response};
use crate::core::stream::MessageLog;
use crate::utils::error::{GatewayError, Result};

/// Caller input for one request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub kind: RequestKind,
    pub document_id: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub selected_text: Option<String>,
    pub model_choice: String,
}

impl SubmitRequest {
    pub fn summarize(document_id: impl Into<String>, model_choice: impl Into<String>) -> Self {
        Self {
            kind: RequestKind::Summarize,
            document_id: document_id.into(),
            question: None,
            selected_text: None,
            model_choice: model_choice.into(),
        }
    }

    pub fn ask(
        document_id: impl Into<String>,
        question: impl Into<String>,
        model_choice: impl Into<String>,
    ) -> Self {
        Self {
            kind: RequestKind::Ask,
            document_id: document_id.into(),
            question: Some(question.into()),
            selected_text: None,
            model_choice: model_choice.into(),
        }
    }

    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validates, enqueues and observes requests
#[derive(Debug)]
pub struct RequestGateway {
    registry: Arc<ProviderRegistry>,
    pricing: Arc<PricingTable>,
    documents: Arc<dyn DocumentStore>,
    responses: Arc<ResponseStore>,
    log: Arc<dyn MessageLog<Request>>,
    await_timeout: Duration,
}

impl RequestGateway {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        pricing: Arc<PricingTable>,
        documents: Arc<dyn DocumentStore>,
        responses: Arc<ResponseStore>,
        log: Arc<dyn MessageLog<Request>>,
        await_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            pricing,
            documents,
            responses,
            log,
            await_timeout,
        }
    }

    /// Default deadline for [`RequestGateway::await_response`]
    pub fn await_timeout(&self) -> Duration {
        self.await_timeout
    }

    /// Validate and enqueue a request. Nothing reaches the stream unless
    /// every check passes.
    pub async fn submit(&self, submit: SubmitRequest) -> Result<RequestId> {
        let question = non_blank(submit.question);
        match submit.kind {
            RequestKind::Ask if question.is_none() => {
                return Err(GatewayError::validation("question is required for ask requests"));
            }
            RequestKind::Summarize if question.is_some() => {
                return Err(GatewayError::validation(
                    "question is only accepted for ask requests",
                ));
            }
            _ => {}
        }

        let document_id = submit.document_id.trim().to_string();
        if document_id.is_empty() {
            return Err(GatewayError::validation("documentId is required"));
        }
        if !self.documents.contains(&document_id).await? {
            return Err(GatewayError::NotFound(format!(
                "Document '{}' not found",
                document_id
            )));
        }

        let model_choice = submit.model_choice.trim().to_string();
        let route = self.registry.resolve(&model_choice).ok_or_else(|| {
            GatewayError::validation(format!("Unknown model choice '{}'", model_choice))
        })?;
        self.pricing.get(route.provider, &route.model)?;

        let request = Request {
            id: RequestId::new(),
            kind: submit.kind,
            document_id,
            question: question.map(|q| q.trim().to_string()),
            selected_text: non_blank(submit.selected_text),
            model_choice,
            created_at: Utc::now(),
        };

        self.responses.register(&request)?;
        match self.log.publish(&request).await {
            Ok(message_id) => {
                info!(
                    request_id = %request.id,
                    kind = request.kind.as_str(),
                    model = %request.model_choice,
                    message_id = %message_id,
                    "Request enqueued"
                );
                Ok(request.id)
            }
            Err(e) => {
                error!(request_id = %request.id, "Failed to enqueue request: {}", e);
                self.responses.discard(&request.id);
                Err(GatewayError::internal("Failed to enqueue request"))
            }
        }
    }

    /// Wait for the Response of a submitted request. On `Timeout` the
    /// request keeps running and can still be polled.
    pub async fn await_response(
        &self,
        id: &RequestId,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let timeout = timeout.unwrap_or(self.await_timeout);
        debug!(request_id = %id, ?timeout, "Awaiting response");
        self.responses.wait(id, timeout).await
    }

    /// Current status, and the Response once terminal
    pub fn status(&self, id: &RequestId) -> Result<RequestSnapshot> {
        self.responses
            .snapshot(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Request '{}' not found", id)))
    }
}
