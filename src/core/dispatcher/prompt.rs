//! Prompt construction for summarize and ask requests

use crate::core::documents::Document;
use crate::core::requests::{Request, RequestKind};
use crate::utils::error::{GatewayError, Result};

fn document_context(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => format!("document '{}'", name),
        _ => "the provided document".to_string(),
    }
}

pub fn summary_prompt(content: &str, document_name: Option<&str>) -> String {
    format!(
        "Please provide a comprehensive summary of {}. Focus on the key points, main ideas, \
         and important details. The summary should be well-structured and capture the essence \
         of the content.\n\nHere is the content to summarize:\n\n{}",
        document_context(document_name),
        content
    )
}

pub fn question_prompt(context: &str, question: &str, document_name: Option<&str>) -> String {
    format!(
        "Please answer the following question about {}. Base your answer only on the \
         information provided in the context. If the answer cannot be found in the context, \
         please state that clearly.\n\nContext:\n{}\n\nQuestion:\n{}",
        document_context(document_name),
        context,
        question
    )
}

/// Build the provider prompt; a selected excerpt replaces the document content
pub fn build_prompt(request: &Request, document: &Document) -> Result<String> {
    let content = request
        .selected_text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(&document.content);
    let name = Some(document.name.as_str());

    match request.kind {
        RequestKind::Summarize => Ok(summary_prompt(content, name)),
        RequestKind::Ask => {
            let question = request
                .question
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .ok_or_else(|| GatewayError::validation("An ask request needs a question"))?;
            Ok(question_prompt(content, question, name))
        }
    }
}
