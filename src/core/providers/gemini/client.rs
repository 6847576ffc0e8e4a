//! Gemini Client

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::models::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, RequestPart,
};
use crate::config::ProviderConfig;
use crate::core::providers::shared::{base_url, build_http_client, post_json};
use crate::core::providers::tokens::estimate_tokens;
use crate::core::providers::unified_provider::ProviderError;
use crate::core::providers::{Completion, CompletionRequest, LlmProvider, UsageSource};

/// Adapter for `POST {base}/v1beta/models/{model}:generateContent`
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url(config.provider_type, config.base_url.as_deref()),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            http_client: build_http_client("gemini")?,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
            },
        };

        let mut builder = self.http_client.post(&url);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-goog-api-key", api_key);
        }

        debug!(provider = "gemini", model = %request.model, "Sending generateContent");
        let response: GenerateContentResponse =
            post_json("gemini", builder, &body, request.timeout).await?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| ProviderError::response_parsing("gemini", "Response has no candidates"))?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

        Ok(match response.usage_metadata {
            Some(usage) => Completion {
                text,
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                usage_source: UsageSource::Vendor,
            },
            None => Completion {
                input_tokens: estimate_tokens(&request.prompt),
                output_tokens: estimate_tokens(&text),
                text,
                usage_source: UsageSource::Estimated,
            },
        })
    }
}
