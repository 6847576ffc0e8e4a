//! Configuration loading and validation

#[cfg(test)]
mod tests {
    use crate::assert_err;
    use docqa_gateway::config::{LogFormat, ResponseMode, StreamBackend};
    use docqa_gateway::{Config, GatewayError, ProviderType};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
providers:
  - provider_type: openai
    api_key: sk-test
models:
  - choice: GPT-4o
    provider: openai
    model: gpt-4o
    input_cost_per_1k_tokens: 5.0
    output_cost_per_1k_tokens: 15.0
"#;

    // ==================== Loading Tests ====================

    #[tokio::test]
    async fn test_example_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/gateway.yaml.example");
        let config = Config::from_file(path).await.unwrap();

        assert_eq!(config.models().len(), 5);
        assert_eq!(config.providers().len(), 5);
        assert_eq!(config.dispatcher().retry.max_attempts, 3);
        assert_eq!(config.stream().backend, StreamBackend::Memory);
        assert_eq!(config.requests().default_mode, ResponseMode::Sync);
        assert!(config.ledger().enabled);
        assert_eq!(config.logging().format, LogFormat::Text);

        let claude = config
            .models()
            .iter()
            .find(|m| m.choice == "Claude")
            .unwrap();
        assert_eq!(claude.provider, ProviderType::Anthropic);
        assert_eq!(claude.prices(), Some((0.008, 0.024)));
    }

    #[tokio::test]
    async fn test_minimal_config_from_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).await.unwrap();
        assert_eq!(config.server().port, 8000);
        assert_eq!(config.stream().lease(), Duration::from_secs(120));
        assert_eq!(config.requests().await_timeout(), Duration::from_secs(120));
        assert_eq!(config.dispatcher().max_tokens, 1000);
        assert!(config.documents().storage_dir.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let err = assert_err!(Config::from_file("/nonexistent/gateway.yaml").await);
        assert!(matches!(err, GatewayError::Config(_)));
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_model_without_provider_is_rejected() {
        let yaml = MINIMAL.replace("provider: openai", "provider: anthropic");
        let err = assert_err!(Config::from_yaml(&yaml));
        assert!(err.to_string().contains("unconfigured provider"));
    }

    #[test]
    fn test_no_models_is_rejected() {
        let err = assert_err!(Config::from_yaml("providers: []\n"));
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let yaml = MINIMAL.replace("input_cost_per_1k_tokens: 5.0", "input_cost_per_1k_tokens: -1.0");
        let err = assert_err!(Config::from_yaml(&yaml));
        assert!(err.to_string().contains("Negative price"));
    }

    #[test]
    fn test_unpriced_model_is_accepted() {
        let yaml = r#"
providers:
  - provider_type: xai
    api_key: xai-test
models:
  - choice: Grok
    provider: xai
    model: grok-1
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.models()[0].prices(), None);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let yaml = format!("{}stream:\n  backend: kafka\n", MINIMAL);
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_async_default_mode() {
        let yaml = format!("{}requests:\n  default_mode: async\n", MINIMAL);
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.requests().default_mode, ResponseMode::Async);
    }
}
