//! Summarize and ask endpoints

use crate::config::ResponseMode;
use crate::core::gateway::SubmitRequest;
use crate::core::requests::{RequestId, Response};
use crate::server::state::AppState;
use crate::utils::error::{ErrorCode, ErrorDetail, GatewayError};
use actix_web::{HttpResponse, Result as ActixResult, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configure request routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/summarize", web::post().to(summarize))
        .route("/ask_question", web::post().to(ask_question))
        .route("/requests/{request_id}", web::get().to(request_status));
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeBody {
    pub document_id: String,
    pub model_choice: String,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub mode: Option<ResponseMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskBody {
    pub document_id: String,
    #[serde(default)]
    pub question: String,
    pub model_choice: String,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub mode: Option<ResponseMode>,
}

/// Reply for async mode
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    pub request_id: RequestId,
}

/// Reply for a successful sync call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub request_id: RequestId,
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost: f64,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub latency_ms: u64,
    pub retries: u32,
}

impl Answer {
    fn from_response(response: Response) -> Self {
        Self {
            request_id: response.request_id,
            text: response.text.unwrap_or_default(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cost: response.cost,
            provider: response.provider,
            model: response.model,
            latency_ms: response.latency_ms,
            retries: response.retries,
        }
    }
}

async fn summarize(
    state: web::Data<AppState>,
    body: web::Json<SummarizeBody>,
) -> ActixResult<HttpResponse> {
    let body = body.into_inner();
    let mut submit = SubmitRequest::summarize(body.document_id, body.model_choice);
    submit.selected_text = body.selected_text;
    run(&state, submit, body.mode).await
}

async fn ask_question(
    state: web::Data<AppState>,
    body: web::Json<AskBody>,
) -> ActixResult<HttpResponse> {
    let body = body.into_inner();
    let mut submit = SubmitRequest::ask(body.document_id, body.question, body.model_choice);
    submit.selected_text = body.selected_text;
    run(&state, submit, body.mode).await
}

async fn run(
    state: &AppState,
    submit: SubmitRequest,
    mode: Option<ResponseMode>,
) -> ActixResult<HttpResponse> {
    let gateway = state.orchestrator.gateway();
    let kind = submit.kind;
    let request_id = gateway.submit(submit).await?;

    match mode.unwrap_or(state.config.requests().default_mode) {
        ResponseMode::Async => {
            debug!(request_id = %request_id, kind = kind.as_str(), "Accepted");
            Ok(HttpResponse::Accepted().json(Accepted { request_id }))
        }
        ResponseMode::Sync => match gateway.await_response(&request_id, None).await {
            Ok(response) if response.is_success() => {
                Ok(HttpResponse::Ok().json(Answer::from_response(response)))
            }
            Ok(response) => {
                let detail = response.error.unwrap_or_else(|| {
                    ErrorDetail::new(ErrorCode::InternalError, "Request failed")
                });
                Ok(detail.to_http_response())
            }
            Err(GatewayError::Timeout(_)) => {
                warn!(request_id = %request_id, "Response not ready before the await deadline");
                Ok(ErrorDetail::new(
                    ErrorCode::Timeout,
                    format!(
                        "No response within {}s; poll /requests/{}",
                        gateway.await_timeout().as_secs(),
                        request_id
                    ),
                )
                .to_http_response())
            }
            Err(e) => Err(e.into()),
        },
    }
}

/// Status of a request, with its Response once terminal
async fn request_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let id = RequestId::from(path.into_inner());
    let snapshot = state.orchestrator.gateway().status(&id)?;
    Ok(HttpResponse::Ok().json(snapshot))
}
