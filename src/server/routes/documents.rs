//! Document endpoints

use crate::core::documents::{Document, document_id_from_name};
use crate::server::state::AppState;
use crate::utils::error::GatewayError;
use actix_multipart::Multipart;
use actix_web::guard::{self, GuardContext};
use actix_web::http::header;
use actix_web::{HttpResponse, Result as ActixResult, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Multipart form field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// Configure document routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/select_pdfcontent", web::post().to(select_document))
        .route("/select_pdfcontent", web::get().to(document_content))
        .service(
            web::resource("/upload_pdf")
                .route(
                    web::post()
                        .guard(guard::fn_guard(is_multipart))
                        .to(upload_multipart),
                )
                .route(web::post().to(upload_document)),
        );
}

fn is_multipart(ctx: &GuardContext<'_>) -> bool {
    ctx.head()
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDocumentRequest {
    #[serde(alias = "pdf_name")]
    pub document_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    #[serde(alias = "pdf_name")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    /// File bytes, base64 encoded
    pub content_base64: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub document_id: String,
    pub name: String,
    pub pages: usize,
    pub content_length: usize,
}

impl From<&Document> for DocumentInfo {
    fn from(document: &Document) -> Self {
        Self {
            document_id: document.id.clone(),
            name: document.name.clone(),
            pages: document.pages,
            content_length: document.content_length,
        }
    }
}

/// Upload result: document info plus the rendered markdown
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub info: DocumentInfo,
    pub content: String,
}

impl From<Document> for UploadResponse {
    fn from(document: Document) -> Self {
        Self {
            info: DocumentInfo::from(&document),
            content: document.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentContent {
    pub name: String,
    pub content: String,
}

/// Select a previously parsed document
async fn select_document(
    state: web::Data<AppState>,
    body: web::Json<SelectDocumentRequest>,
) -> ActixResult<HttpResponse> {
    let id = body.document_id.trim();
    if id.is_empty() {
        return Err(GatewayError::validation("documentId is required").into());
    }
    debug!(document_id = id, "Select document");

    let document = state.orchestrator.library().select(id).await?;
    Ok(HttpResponse::Ok().json(DocumentInfo::from(&document)))
}

/// Markdown content of a document, looked up by id or by file name
async fn document_content(
    state: web::Data<AppState>,
    query: web::Query<ContentQuery>,
) -> ActixResult<HttpResponse> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| GatewayError::validation("name is required"))?;

    let library = state.orchestrator.library();
    let id = if library.store().contains(name).await? {
        name.to_string()
    } else {
        document_id_from_name(name)
    };
    let document = library.select(&id).await?;

    Ok(HttpResponse::Ok().json(DocumentContent {
        name: document.name,
        content: document.content,
    }))
}

/// Extract a file sent as `multipart/form-data` in the `file` field
async fn upload_multipart(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let limit = state.config.server().max_body_size;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            warn!("Error reading multipart field: {}", e);
            GatewayError::validation(format!("Invalid multipart data: {}", e))
        })?;

        if field.name() != Some(FILE_FIELD) {
            while field.next().await.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::validation("file part has no filename"))?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                GatewayError::validation(format!("Error reading file '{}': {}", file_name, e))
            })?;
            if data.len() + bytes.len() > limit {
                return Err(GatewayError::validation(format!(
                    "file '{}' exceeds the {} byte upload limit",
                    file_name, limit
                ))
                .into());
            }
            data.extend_from_slice(&bytes);
        }
        upload = Some((file_name, data));
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| GatewayError::validation("multipart body has no 'file' part"))?;
    info!(file = %file_name, bytes = bytes.len(), "Document upload (multipart)");

    let document = state
        .orchestrator
        .library()
        .ingest(&file_name, &bytes)
        .await?;
    Ok(HttpResponse::Ok().json(UploadResponse::from(document)))
}

/// Extract a base64 encoded file sent as JSON
async fn upload_document(
    state: web::Data<AppState>,
    body: web::Json<UploadRequest>,
) -> ActixResult<HttpResponse> {
    let bytes = STANDARD
        .decode(body.content_base64.trim())
        .map_err(|e| GatewayError::validation(format!("contentBase64 is not valid base64: {}", e)))?;
    info!(file = %body.file_name, bytes = bytes.len(), "Document upload");

    let document = state
        .orchestrator
        .library()
        .ingest(&body.file_name, &bytes)
        .await?;
    Ok(HttpResponse::Ok().json(UploadResponse::from(document)))
}
