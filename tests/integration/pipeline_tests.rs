//! Submit, dispatch and await through the request stream

#[cfg(test)]
mod tests {
    use crate::common::fixtures::{DOCUMENT_ID, DOCUMENT_TEXT, Pipeline};
    use crate::common::providers::{INPUT_TOKENS, OUTPUT_TOKENS, ScriptedProvider, Step};
    use crate::{assert_err, assert_ok};
    use docqa_gateway::core::stream::MessageLog;
    use docqa_gateway::{
        ErrorCode, GatewayError, ProviderError, RequestStatus, SubmitRequest,
    };
    use std::time::{Duration, Instant};

    // ==================== Outcome Tests ====================

    #[tokio::test]
    async fn test_summarize_cost_matches_price_table() {
        let pipeline = Pipeline::builder(ScriptedProvider::answering("openai"))
            .start(2)
            .await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        let response = pipeline.response(&id).await;

        assert!(response.is_success());
        assert_eq!(response.input_tokens, INPUT_TOKENS);
        assert_eq!(response.output_tokens, OUTPUT_TOKENS);
        // 500/1000 * 5 + 200/1000 * 15
        assert!((response.cost - 5.5).abs() < 1e-9);
        assert_eq!(response.provider.as_deref(), Some("openai"));
        assert_eq!(response.model.as_deref(), Some("gpt-4o"));
        assert!((pipeline.tracker.cost_by_provider("openai") - 5.5).abs() < 1e-9);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_ask_prompt_carries_question_and_document() {
        let provider = ScriptedProvider::answering("openai");
        let pipeline = Pipeline::builder(provider.clone()).start(1).await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::ask(DOCUMENT_ID, "How much did revenue grow?", "GPT-4o"))
                .await
        );
        assert!(pipeline.response(&id).await.is_success());

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("How much did revenue grow?"));
        assert!(prompts[0].contains(DOCUMENT_TEXT));

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_selected_text_replaces_document_content() {
        let provider = ScriptedProvider::answering("openai");
        let pipeline = Pipeline::builder(provider.clone()).start(1).await;

        let submit = SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o")
            .with_selected_text("Only this paragraph.");
        let id = assert_ok!(pipeline.gateway.submit(submit).await);
        assert!(pipeline.response(&id).await.is_success());

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Only this paragraph."));
        assert!(!prompt.contains(DOCUMENT_TEXT));

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_every_request_gets_exactly_one_response() {
        let provider = ScriptedProvider::answering("openai");
        let pipeline = Pipeline::builder(provider.clone()).start(4).await;

        let mut ids = Vec::new();
        for i in 0..20 {
            let submit = if i % 2 == 0 {
                SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o")
            } else {
                SubmitRequest::ask(DOCUMENT_ID, format!("question {}", i), "GPT-4o")
            };
            ids.push(assert_ok!(pipeline.gateway.submit(submit).await));
        }
        for id in &ids {
            assert!(pipeline.response(id).await.is_success());
        }

        let stats = pipeline.responses.stats();
        assert_eq!(stats.completed, 20);
        assert_eq!(stats.failed, 0);
        assert_eq!(provider.calls(), 20);
        assert_eq!(pipeline.log.pending_count("dispatchers").await.unwrap(), 0);
        assert_eq!(pipeline.tracker.summary().total_requests, 20);

        pipeline.shutdown().await;
    }

    // ==================== Validation Tests ====================

    #[tokio::test]
    async fn test_empty_question_never_reaches_stream() {
        let provider = ScriptedProvider::answering("openai");
        let pipeline = Pipeline::builder(provider.clone()).start(1).await;

        let err = assert_err!(
            pipeline
                .gateway
                .submit(SubmitRequest::ask(DOCUMENT_ID, "", "GPT-4o"))
                .await
        );
        assert!(matches!(err, GatewayError::Validation(_)));
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(pipeline.log.len().await.unwrap(), 0);
        assert_eq!(provider.calls(), 0);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_unpriced_model_makes_no_provider_call() {
        let provider = ScriptedProvider::answering("openai");
        let pipeline = Pipeline::builder(provider.clone()).start(1).await;

        let err = assert_err!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "Grok"))
                .await
        );
        assert!(matches!(err, GatewayError::UnknownModel(_)));
        assert_eq!(pipeline.log.len().await.unwrap(), 0);
        assert_eq!(provider.calls(), 0);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let pipeline = Pipeline::builder(ScriptedProvider::answering("openai"))
            .build()
            .await;
        let err = assert_err!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize("nope", "GPT-4o"))
                .await
        );
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    // ==================== Retry Tests ====================

    #[tokio::test]
    async fn test_two_timeouts_then_success_reports_two_retries() {
        let provider = ScriptedProvider::new("openai", vec![Step::Hang, Step::Hang]);
        let pipeline = Pipeline::builder(provider.clone())
            .call_timeout(Duration::from_millis(50))
            .start(1)
            .await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        let response = pipeline.response(&id).await;

        assert_eq!(response.status, RequestStatus::Completed);
        assert_eq!(response.retries, 2);
        assert_eq!(provider.calls(), 3);
        assert_eq!(pipeline.responses.stats().completed, 1);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_permanent_error_fails_without_retry() {
        let provider = ScriptedProvider::new(
            "openai",
            vec![Step::Fail(ProviderError::authentication("openai", "bad key"))],
        );
        let pipeline = Pipeline::builder(provider.clone()).start(1).await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        let response = pipeline.response(&id).await;

        assert_eq!(response.status, RequestStatus::Failed);
        assert_eq!(response.retries, 0);
        assert_eq!(
            response.error.as_ref().map(|e| e.error_code),
            Some(ErrorCode::ProviderAuthError)
        );
        // A failed Response never carries a partial cost
        assert_eq!(response.cost, 0.0);
        assert_eq!(provider.calls(), 1);

        pipeline.shutdown().await;
    }

    // ==================== Circuit Breaker Tests ====================

    #[tokio::test]
    async fn test_open_breaker_fails_fast_without_calls() {
        let unavailable = || Step::Fail(ProviderError::api_error("openai", 503, "overloaded"));
        let provider = ScriptedProvider::new("openai", vec![unavailable(), unavailable(), unavailable()]);
        let pipeline = Pipeline::builder(provider.clone())
            .circuit_breaker(1, 60)
            .start(1)
            .await;

        let first = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        let response = pipeline.response(&first).await;
        assert_eq!(response.status, RequestStatus::Failed);
        assert_eq!(response.retries, 2);
        assert_eq!(
            response.error.as_ref().map(|e| e.error_code),
            Some(ErrorCode::ProviderError)
        );
        assert_eq!(provider.calls(), 3);

        let started = Instant::now();
        let second = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        let response = pipeline.response(&second).await;
        assert_eq!(
            response.error.as_ref().map(|e| e.error_code),
            Some(ErrorCode::ProviderUnavailable)
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(provider.calls(), 3);

        pipeline.shutdown().await;
    }
}
