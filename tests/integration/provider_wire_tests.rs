//! Requests through the whole pipeline against `wiremock` vendor servers

#[cfg(test)]
mod tests {
    use crate::assert_ok;
    use docqa_gateway::{Config, ErrorCode, Orchestrator, RequestStatus, SubmitRequest};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        let uri = server.uri();
        let yaml = format!(
            r#"
providers:
  - provider_type: openai
    api_key: sk-test
    base_url: "{uri}"
    timeout: 5
  - provider_type: anthropic
    api_key: ant-key
    base_url: "{uri}"
    timeout: 5
  - provider_type: gemini
    api_key: goog-key
    base_url: "{uri}"
    timeout: 5
models:
  - choice: GPT-4o
    provider: openai
    model: gpt-4o
    input_cost_per_1k_tokens: 5.0
    output_cost_per_1k_tokens: 15.0
  - choice: Claude
    provider: anthropic
    model: claude-3-sonnet-20240229
    input_cost_per_1k_tokens: 0.008
    output_cost_per_1k_tokens: 0.024
  - choice: Gemini-Flash
    provider: gemini
    model: gemini-1.5-flash
    input_cost_per_1k_tokens: 0.0035
    output_cost_per_1k_tokens: 0.0035
dispatcher:
  workers: 2
  retry:
    max_attempts: 3
    base_delay: 5
    max_delay: 20
stream:
  lease_ms: 60000
  block_ms: 50
requests:
  await_timeout_secs: 10
"#
        );
        Config::from_yaml(&yaml).unwrap()
    }

    async fn running(server: &MockServer) -> Orchestrator {
        let orchestrator = Orchestrator::new(config_for(server)).await.unwrap();
        orchestrator.start();
        orchestrator
            .library()
            .ingest("handbook.pdf", "Employees get thirty days of leave.".as_bytes())
            .await
            .unwrap();
        orchestrator
    }

    fn openai_answer(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}}],
            "usage": {"prompt_tokens": 500, "completion_tokens": 200, "total_tokens": 700}
        }))
    }

    // ==================== OpenAI Tests ====================

    #[tokio::test]
    async fn test_openai_summary_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o", "max_tokens": 1000})))
            .respond_with(openai_answer("Leave policy summary."))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = running(&server).await;
        let gateway = orchestrator.gateway();
        let id = assert_ok!(gateway.submit(SubmitRequest::summarize("handbook", "GPT-4o")).await);
        let response = assert_ok!(gateway.await_response(&id, None).await);

        assert_eq!(response.text.as_deref(), Some("Leave policy summary."));
        assert_eq!(response.input_tokens, 500);
        assert_eq!(response.output_tokens, 200);
        assert!((response.cost - 5.5).abs() < 1e-9);
        assert_eq!(response.retries, 0);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_openai_5xx_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(openai_answer("Third time lucky."))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = running(&server).await;
        let gateway = orchestrator.gateway();
        let id = assert_ok!(gateway.submit(SubmitRequest::summarize("handbook", "GPT-4o")).await);
        let response = assert_ok!(gateway.await_response(&id, None).await);

        assert_eq!(response.status, RequestStatus::Completed);
        assert_eq!(response.retries, 2);

        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_openai_bad_key_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = running(&server).await;
        let gateway = orchestrator.gateway();
        let id = assert_ok!(gateway.submit(SubmitRequest::summarize("handbook", "GPT-4o")).await);
        let response = assert_ok!(gateway.await_response(&id, None).await);

        assert_eq!(response.status, RequestStatus::Failed);
        assert_eq!(
            response.error.map(|e| e.error_code),
            Some(ErrorCode::ProviderAuthError)
        );

        orchestrator.shutdown().await;
    }

    // ==================== Anthropic Tests ====================

    #[tokio::test]
    async fn test_anthropic_question_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ant-key"))
            .and(body_partial_json(json!({"model": "claude-3-sonnet-20240229"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Thirty days."}],
                "usage": {"input_tokens": 1000, "output_tokens": 1000}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = running(&server).await;
        let gateway = orchestrator.gateway();
        let id = assert_ok!(
            gateway
                .submit(SubmitRequest::ask("handbook", "How much leave?", "Claude"))
                .await
        );
        let response = assert_ok!(gateway.await_response(&id, None).await);

        assert_eq!(response.text.as_deref(), Some("Thirty days."));
        assert_eq!(response.provider.as_deref(), Some("anthropic"));
        assert!((response.cost - 0.032).abs() < 1e-9);

        orchestrator.shutdown().await;
    }

    // ==================== Gemini Tests ====================

    #[tokio::test]
    async fn test_gemini_summary_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "goog-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Short."}], "role": "model"}}],
                "usageMetadata": {"promptTokenCount": 2000, "candidatesTokenCount": 1000, "totalTokenCount": 3000}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orchestrator = running(&server).await;
        let gateway = orchestrator.gateway();
        let id = assert_ok!(
            gateway
                .submit(SubmitRequest::summarize("handbook", "Gemini-Flash"))
                .await
        );
        let response = assert_ok!(gateway.await_response(&id, None).await);

        assert_eq!(response.text.as_deref(), Some("Short."));
        // 2 * 0.0035 + 1 * 0.0035
        assert!((response.cost - 0.0105).abs() < 1e-9);
        assert_eq!(orchestrator.tracker().summary().total_requests, 1);

        orchestrator.shutdown().await;
    }
}
