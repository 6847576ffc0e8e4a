//! The full HTTP application over a running pipeline

#[cfg(test)]
mod tests {
    use crate::common::{ScriptedProvider, Step};
    use actix_web::http::StatusCode;
    use actix_web::{test, web};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use docqa_gateway::config::{ModelConfig, ResponseMode};
    use docqa_gateway::core::stream::MessageLog;
    use docqa_gateway::server::HttpServer;
    use docqa_gateway::{Config, LlmProvider, Orchestrator, ProviderError, ProviderType};
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn config() -> Config {
        let mut config = Config::default();
        config.gateway.models = vec![ModelConfig::new(
            "GPT-4o",
            ProviderType::OpenAI,
            "gpt-4o",
            5.0,
            15.0,
        )];
        config.gateway.dispatcher.workers = 2;
        config.gateway.dispatcher.retry.base_delay = 5;
        config.gateway.dispatcher.retry.max_delay = 20;
        config.gateway.requests.default_mode = ResponseMode::Sync;
        config.gateway.requests.await_timeout_secs = 5;
        config
    }

    async fn server(provider: Arc<ScriptedProvider>) -> HttpServer {
        let providers: Vec<Arc<dyn LlmProvider>> = vec![provider];
        let orchestrator = Orchestrator::with_providers(config(), providers)
            .await
            .unwrap();
        orchestrator.start();
        HttpServer::from_orchestrator(Arc::new(orchestrator))
    }

    // ==================== Request Flow Tests ====================

    #[actix_web::test]
    async fn test_upload_then_summarize() {
        let provider = ScriptedProvider::new("openai", vec![Step::Answer("Revenue grew.")]);
        let server = server(Arc::clone(&provider)).await;
        let app =
            test::init_service(HttpServer::create_app(web::Data::new(server.state().clone())))
                .await;

        let req = test::TestRequest::post()
            .uri("/upload_pdf")
            .set_json(json!({
                "fileName": "Q3 Results.pdf",
                "contentBase64": STANDARD.encode("Revenue grew 12% in Q3.")
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let document_id = body["documentId"].as_str().unwrap().to_string();
        assert_eq!(document_id, "q3_results");

        let req = test::TestRequest::post()
            .uri("/summarize")
            .set_json(json!({ "documentId": document_id, "modelChoice": "GPT-4o" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["text"], "Revenue grew.");
        assert!((body["cost"].as_f64().unwrap() - 5.5).abs() < 1e-9);
        assert_eq!(provider.calls(), 1);
        assert!(provider.prompts()[0].contains("Revenue grew 12% in Q3."));

        let req = test::TestRequest::get().uri("/usage").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["totals"]["totalRequests"], 1);

        server.state().orchestrator.shutdown().await;
    }

    #[actix_web::test]
    async fn test_provider_failure_maps_to_status() {
        let provider = ScriptedProvider::new(
            "openai",
            vec![Step::Fail(ProviderError::authentication("openai", "bad key"))],
        );
        let server = server(Arc::clone(&provider)).await;
        server
            .state()
            .orchestrator
            .library()
            .ingest("report.pdf", b"Revenue grew 12%.")
            .await
            .unwrap();
        let app =
            test::init_service(HttpServer::create_app(web::Data::new(server.state().clone())))
                .await;

        let req = test::TestRequest::post()
            .uri("/ask_question")
            .set_json(json!({
                "documentId": "report",
                "question": "What grew?",
                "modelChoice": "GPT-4o"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "PROVIDER_AUTH_ERROR");
        assert_eq!(provider.calls(), 1);

        server.state().orchestrator.shutdown().await;
    }

    // ==================== Document Event Tests ====================

    #[actix_web::test]
    async fn test_multipart_upload_and_select_are_audited() {
        let mut config = config();
        config.gateway.stream.document_events = Some("pdf_events".to_string());
        let orchestrator = Orchestrator::with_providers(
            config,
            vec![ScriptedProvider::answering("openai") as Arc<dyn LlmProvider>],
        )
        .await
        .unwrap();
        let server = HttpServer::from_orchestrator(Arc::new(orchestrator));
        let app =
            test::init_service(HttpServer::create_app(web::Data::new(server.state().clone())))
                .await;

        let body = "--b0undary\r\n\
                    Content-Disposition: form-data; name=\"file\"; filename=\"Q3 Results.pdf\"\r\n\
                    \r\n\
                    Revenue grew 12% in Q3.\r\n\
                    --b0undary--\r\n";
        let req = test::TestRequest::post()
            .uri("/upload_pdf")
            .insert_header(("content-type", "multipart/form-data; boundary=b0undary"))
            .set_payload(body)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["documentId"], "q3_results");
        assert!(body["content"].as_str().unwrap().contains("Revenue grew 12% in Q3."));

        let req = test::TestRequest::get()
            .uri("/select_pdfcontent?pdf_name=Q3%20Results.pdf")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let events = server.state().orchestrator.library().events().unwrap();
        let batch = events
            .read_group("audit", "reader", 10, std::time::Duration::ZERO)
            .await
            .unwrap();
        let recorded: Vec<Value> = batch
            .iter()
            .map(|m| serde_json::to_value(&m.payload).unwrap())
            .collect();
        assert_eq!(
            recorded,
            vec![
                json!({ "action": "upload_pdf", "pdf_name": "q3_results" }),
                json!({ "action": "select_pdf", "pdf_name": "q3_results" }),
            ]
        );
    }

    // ==================== Validation Tests ====================

    #[actix_web::test]
    async fn test_malformed_json_is_validation_error() {
        let provider = ScriptedProvider::answering("openai");
        let server = server(Arc::clone(&provider)).await;
        let app =
            test::init_service(HttpServer::create_app(web::Data::new(server.state().clone())))
                .await;

        let req = test::TestRequest::post()
            .uri("/summarize")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"documentId\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errorCode"], "VALIDATION_ERROR");

        let req = test::TestRequest::post()
            .uri("/ask_question")
            .set_json(json!({ "documentId": "report", "question": "  ", "modelChoice": "GPT-4o" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider.calls(), 0);

        server.state().orchestrator.shutdown().await;
    }

    // ==================== Service Tests ====================

    #[actix_web::test]
    async fn test_health_and_models() {
        let server = server(ScriptedProvider::answering("openai")).await;
        let app =
            test::init_service(HttpServer::create_app(web::Data::new(server.state().clone())))
                .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("docqa-gateway")
        );
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");

        let req = test::TestRequest::get().uri("/models").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["choice"], "GPT-4o");
        assert_eq!(body[0]["provider"], "openai");
        assert_eq!(body[0]["outputCostPer1kTokens"], 15.0);

        server.state().orchestrator.shutdown().await;
    }
}
