//! Crash and redelivery of unacknowledged requests
//!
//! A "crashed" worker is a consumer that reads a message and never
//! acknowledges it; the stream hands the message to a live worker once the
//! lease runs out.

#[cfg(test)]
mod tests {
    use crate::assert_ok;
    use crate::common::fixtures::{DOCUMENT_ID, GROUP, Pipeline};
    use crate::common::providers::{ScriptedProvider, Step};
    use docqa_gateway::core::stream::MessageLog;
    use docqa_gateway::{RequestStatus, SubmitRequest};
    use std::time::Duration;

    const LEASE: Duration = Duration::from_millis(150);

    async fn wait_until_acknowledged(pipeline: &Pipeline) {
        for _ in 0..200 {
            if pipeline.log.pending_count(GROUP).await.unwrap() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("message was never acknowledged");
    }

    // ==================== Crash Before Completion ====================

    #[tokio::test]
    async fn test_crash_before_completion_is_redelivered_once() {
        let provider = ScriptedProvider::answering("openai");
        let mut pipeline = Pipeline::builder(provider.clone())
            .lease(LEASE)
            .build()
            .await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );

        // The crashed worker takes the message and disappears
        let taken = pipeline
            .log
            .read_group(GROUP, "crashed", 1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].payload.id, id);

        pipeline.start_workers(2);
        let response = pipeline.response(&id).await;

        assert!(response.is_success());
        assert_eq!(provider.calls(), 1);
        wait_until_acknowledged(&pipeline).await;
        assert_eq!(pipeline.responses.stats().completed, 1);

        pipeline.shutdown().await;
    }

    // ==================== Crash After Completion ====================

    #[tokio::test]
    async fn test_crash_after_completion_is_not_reprocessed() {
        let provider = ScriptedProvider::new("openai", vec![Step::Answer("first answer")]);
        let mut pipeline = Pipeline::builder(provider.clone())
            .lease(LEASE)
            .build()
            .await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );

        // The crashed worker recorded its Response but died before acknowledging
        let taken = pipeline
            .log
            .read_group(GROUP, "crashed", 1, Duration::ZERO)
            .await
            .unwrap();
        let request = taken[0].payload.clone();
        let recorded = pipeline.dispatcher.process(&request).await;
        assert!(pipeline.responses.complete(recorded.clone()));
        assert_eq!(provider.calls(), 1);

        pipeline.start_workers(2);
        wait_until_acknowledged(&pipeline).await;

        let response = pipeline.response(&id).await;
        assert_eq!(response, recorded);
        assert_eq!(response.text.as_deref(), Some("first answer"));
        assert_eq!(provider.calls(), 1);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_terminal_response_is_rejected() {
        let mut pipeline = Pipeline::builder(ScriptedProvider::answering("openai"))
            .build()
            .await;
        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        pipeline.start_workers(1);
        let first = pipeline.response(&id).await;

        let taken = pipeline.gateway.status(&id).unwrap();
        assert_eq!(taken.status, RequestStatus::Completed);

        let mut conflicting = first.clone();
        conflicting.text = Some("conflicting".to_string());
        assert!(!pipeline.responses.complete(conflicting));
        assert_eq!(pipeline.response(&id).await, first);

        pipeline.shutdown().await;
    }

    // ==================== Shutdown ====================

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_request() {
        let provider = ScriptedProvider::new("openai", vec![Step::Slow(Duration::from_millis(200))]);
        let pipeline = Pipeline::builder(provider.clone())
            .call_timeout(Duration::from_secs(2))
            .start(1)
            .await;

        let id = assert_ok!(
            pipeline
                .gateway
                .submit(SubmitRequest::summarize(DOCUMENT_ID, "GPT-4o"))
                .await
        );
        // Let the worker pick the request up
        for _ in 0..100 {
            if provider.calls() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let responses = pipeline.responses.clone();
        let log = pipeline.log.clone();
        pipeline.shutdown().await;

        assert_eq!(responses.status(&id), Some(RequestStatus::Completed));
        assert_eq!(log.pending_count(GROUP).await.unwrap(), 0);
    }
}
