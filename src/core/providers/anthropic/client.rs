//! Anthropic Client

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::models::{Message, MessagesRequest, MessagesResponse};
use crate::config::ProviderConfig;
use crate::core::providers::shared::{base_url, build_http_client, post_json};
use crate::core::providers::tokens::estimate_tokens;
use crate::core::providers::unified_provider::ProviderError;
use crate::core::providers::{Completion, CompletionRequest, LlmProvider, UsageSource};

const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Adapter for `POST {base}/v1/messages`
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    base_url: String,
    api_key: Option<String>,
    api_version: String,
    http_client: Client,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url(config.provider_type, config.base_url.as_deref()),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            api_version: config
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            http_client: build_http_client("anthropic")?,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let mut builder = self
            .http_client
            .post(&url)
            .header("anthropic-version", &self.api_version);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        debug!(provider = "anthropic", model = %request.model, "Sending messages request");
        let response: MessagesResponse =
            post_json("anthropic", builder, &body, request.timeout).await?;

        if response.content.is_empty() {
            return Err(ProviderError::response_parsing(
                "anthropic",
                "Response has no content blocks",
            ));
        }
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(match response.usage {
            Some(usage) => Completion {
                text,
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
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
