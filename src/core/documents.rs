//! Documents
//!
//! Text extraction is an external collaborator reached through
//! [`TextExtractor`]; this module only stores what it produced. A document is
//! immutable once registered: re-uploading identical content returns the
//! existing id, different content under the same name gets a fresh id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::stream::MessageLog;
use crate::utils::error::{GatewayError, Result};

/// A parsed document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Markdown rendering of the extracted pages
    pub content: String,
    pub pages: usize,
    pub content_length: usize,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: String, pages: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content_length: content.chars().count(),
            content,
            pages,
            created_at: Utc::now(),
        }
    }
}

/// Listing entry without the content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub pages: usize,
    pub content_length: usize,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            pages: doc.pages,
            content_length: doc.content_length,
        }
    }
}

/// Storage for parsed documents
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Register a document; fails if the id is taken
    async fn insert(&self, document: Document) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Document>>;

    async fn list(&self) -> Result<Vec<DocumentSummary>>;

    /// Remove a document; returns whether it existed
    async fn remove(&self, id: &str) -> Result<bool>;

    async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

/// Process-local document store
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<String, Document>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: Document) -> Result<()> {
        use dashmap::mapref::entry::Entry;
        match self.documents.entry(document.id.clone()) {
            Entry::Occupied(_) => Err(GatewayError::validation(format!(
                "Document '{}' already exists",
                document.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(document);
                Ok(())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.get(id).map(|d| d.clone()))
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>> {
        let mut docs: Vec<_> = self
            .documents
            .iter()
            .map(|d| DocumentSummary::from(d.value()))
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.documents.remove(id).is_some())
    }
}

/// Documents stored as `{id}.md` files in a directory
#[derive(Debug)]
pub struct DirectoryDocumentStore {
    dir: PathBuf,
}

impl DirectoryDocumentStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!("Document storage directory: {:?}", dir);
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(GatewayError::validation(format!("Invalid document id: {}", id)));
        }
        Ok(self.dir.join(format!("{}.md", id)))
    }
}

#[async_trait]
impl DocumentStore for DirectoryDocumentStore {
    async fn insert(&self, document: Document) -> Result<()> {
        let path = self.path_for(&document.id)?;
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(GatewayError::validation(format!(
                    "Document '{}' already exists",
                    document.id
                )));
            }
            Err(e) => return Err(e.into()),
        };
        tokio::io::AsyncWriteExt::write_all(&mut file, document.content.as_bytes()).await?;
        debug!(document_id = %document.id, "Document written to {:?}", path);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let Ok(path) = self.path_for(id) else {
            return Ok(None);
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let pages = count_pages(&content);
                let name = heading_name(&content).unwrap_or(id).to_string();
                let mut doc = Document::new(id, name, content, pages);
                if let Ok(modified) = tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
                    doc.created_at = modified.into();
                }
                Ok(Some(doc))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<DocumentSummary>> {
        let mut docs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(doc) = self.get(id).await? {
                docs.push(DocumentSummary::from(&doc));
            }
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Boundary to the external text-extraction collaborator
pub trait TextExtractor: Send + Sync + std::fmt::Debug {
    /// Extract page texts from an uploaded file
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<String>>;
}

/// Extractor for pre-extracted UTF-8 text; pages are separated by form feeds
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<String>> {
        if bytes.starts_with(b"%PDF") {
            return Err(GatewayError::validation(format!(
                "'{}' is a binary PDF; upload its extracted text instead",
                file_name
            )));
        }
        let text = std::str::from_utf8(bytes).map_err(|_| {
            GatewayError::validation(format!("'{}' is not valid UTF-8 text", file_name))
        })?;

        let pages: Vec<String> = text
            .split('\x0C')
            .map(|page| page.trim().to_string())
            .filter(|page| !page.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(GatewayError::validation(format!(
                "'{}' contains no text",
                file_name
            )));
        }
        Ok(pages)
    }
}

/// Render extracted pages as markdown: `# name` then `## Page n` sections
pub fn to_markdown(name: &str, pages: &[String]) -> String {
    let mut markdown = format!("# {}\n\n", name);
    for (i, page) in pages.iter().enumerate() {
        markdown.push_str(&format!("## Page {}\n\n{}\n\n", i + 1, page));
    }
    markdown
}

fn count_pages(markdown: &str) -> usize {
    markdown
        .lines()
        .filter(|line| line.starts_with("## Page "))
        .count()
}

/// Name from the leading `# name` line of a rendered document
fn heading_name(markdown: &str) -> Option<&str> {
    markdown
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !id.starts_with('.')
}

/// Derive a document id from a file name: stem, lowercased, unsafe chars as `_`
pub fn document_id_from_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim_end_matches(".pdf")
        .trim_end_matches(".PDF")
        .trim_end_matches(".txt");
    let id: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let id = id.trim_matches('_').to_string();
    if id.is_empty() { "document".to_string() } else { id }
}

/// What a caller did with a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentAction {
    SelectPdf,
    UploadPdf,
}

/// Audit record published on the document events log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub action: DocumentAction,
    #[serde(rename = "pdf_name")]
    pub document_id: String,
}

/// Upload pipeline: extract, render, register
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    events: Option<Arc<dyn MessageLog<DocumentEvent>>>,
}

impl DocumentLibrary {
    pub fn new(store: Arc<dyn DocumentStore>, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            store,
            extractor,
            events: None,
        }
    }

    /// Publish select and upload events to `events`
    pub fn with_events(mut self, events: Arc<dyn MessageLog<DocumentEvent>>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn events(&self) -> Option<&Arc<dyn MessageLog<DocumentEvent>>> {
        self.events.as_ref()
    }

    /// Extract and register an uploaded file
    pub async fn ingest(&self, file_name: &str, bytes: &[u8]) -> Result<Document> {
        let document = self.register(file_name, bytes).await?;
        self.emit(DocumentAction::UploadPdf, &document.id).await;
        Ok(document)
    }

    /// Look up a document a caller is about to work on
    pub async fn select(&self, id: &str) -> Result<Document> {
        let document = self.get(id).await?;
        self.emit(DocumentAction::SelectPdf, &document.id).await;
        Ok(document)
    }

    /// Audit events are best effort and never fail the caller
    async fn emit(&self, action: DocumentAction, document_id: &str) {
        let Some(events) = &self.events else {
            return;
        };
        let event = DocumentEvent {
            action,
            document_id: document_id.to_string(),
        };
        if let Err(e) = events.publish(&event).await {
            warn!(document_id, ?action, "Failed to publish document event: {}", e);
        }
    }

    async fn register(&self, file_name: &str, bytes: &[u8]) -> Result<Document> {
        if file_name.trim().is_empty() {
            return Err(GatewayError::validation("fileName is required"));
        }
        let pages = self.extractor.extract(file_name, bytes)?;
        let display_name = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name)
            .trim_end_matches(".pdf");
        let content = to_markdown(display_name, &pages);
        let base_id = document_id_from_name(file_name);

        // Same name and content is idempotent; same name, new content gets a suffix
        for n in 1..=100 {
            let id = if n == 1 {
                base_id.clone()
            } else {
                format!("{}-{}", base_id, n)
            };
            match self.store.get(&id).await? {
                Some(existing) if existing.content == content => return Ok(existing),
                Some(_) => continue,
                None => {
                    let document = Document::new(id, display_name, content, pages.len());
                    self.store.insert(document.clone()).await?;
                    info!(
                        document_id = %document.id,
                        pages = document.pages,
                        "Document registered"
                    );
                    return Ok(document);
                }
            }
        }

        Err(GatewayError::validation(format!(
            "Too many documents named '{}'",
            base_id
        )))
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("Document '{}' not found", id)))
    }
}
