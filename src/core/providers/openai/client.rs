//! OpenAI Client

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::ProviderConfig;
use crate::core::providers::shared::{base_url, build_http_client, post_json};
use crate::core::providers::tokens::estimate_tokens;
use crate::core::providers::unified_provider::ProviderError;
use crate::core::providers::{Completion, CompletionRequest, LlmProvider, UsageSource};

/// Adapter for `POST {base}/chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
    organization: Option<String>,
    http_client: Client,
}

impl OpenAIProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let name = config.provider_type.as_str();
        Ok(Self {
            name,
            base_url: base_url(config.provider_type, config.base_url.as_deref()),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            organization: config.organization.clone(),
            http_client: build_http_client(name)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
        };

        let mut builder = self.http_client.post(&url);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        if let Some(organization) = &self.organization {
            builder = builder.header("OpenAI-Organization", organization);
        }

        debug!(provider = self.name, model = %request.model, "Sending chat completion");
        let response: ChatCompletionResponse =
            post_json(self.name, builder, &body, request.timeout).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::response_parsing(self.name, "Response has no choices"))?
            .message
            .content
            .unwrap_or_default();

        Ok(match response.usage {
            Some(usage) => Completion {
                text,
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
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
