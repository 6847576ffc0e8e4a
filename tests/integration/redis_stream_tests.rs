//! Redis Streams backend against a live server
//!
//! These tests need a Redis 6.2+ server at `REDIS_URL`
//! (default `redis://127.0.0.1:6379`).
//! Run with: cargo test --features redis -- --ignored

#[cfg(all(test, feature = "redis"))]
mod tests {
    use docqa_gateway::core::stream::{MessageLog, RedisStream};
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use uuid::Uuid;

    const GROUP: &str = "dispatchers";
    const NO_WAIT: Duration = Duration::from_millis(10);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Job {
        n: u32,
    }

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    /// A stream on a fresh key, deleted again by [`drop_key`]
    async fn stream(lease: Duration) -> (RedisStream<Job>, String) {
        let key = format!("docqa:test:{}", Uuid::new_v4());
        let stream = RedisStream::connect(&redis_url(), key.clone(), lease)
            .await
            .unwrap();
        (stream, key)
    }

    async fn drop_key(key: &str) {
        let client = redis::Client::open(redis_url()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await.unwrap();
    }

    // ==================== Delivery Tests ====================

    #[tokio::test]
    #[ignore]
    async fn test_publish_read_ack() {
        let (stream, key) = stream(Duration::from_secs(30)).await;
        stream.publish(&Job { n: 1 }).await.unwrap();
        stream.publish(&Job { n: 2 }).await.unwrap();

        let batch = stream.read_group(GROUP, "worker-1", 10, NO_WAIT).await.unwrap();
        let jobs: Vec<u32> = batch.iter().map(|m| m.payload.n).collect();
        assert_eq!(jobs, vec![1, 2]);
        assert!(batch.iter().all(|m| m.delivery_count == 1));
        assert_eq!(stream.pending_count(GROUP).await.unwrap(), 2);

        for message in &batch {
            assert!(stream.ack(GROUP, &message.id).await.unwrap());
        }
        assert_eq!(stream.pending_count(GROUP).await.unwrap(), 0);
        assert!(!stream.ack(GROUP, &batch[0].id).await.unwrap());
        assert_eq!(stream.len().await.unwrap(), 2);

        // Nothing new for another consumer of the group
        let empty = stream.read_group(GROUP, "worker-2", 10, NO_WAIT).await.unwrap();
        assert!(empty.is_empty());

        drop_key(&key).await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_pending_count_without_group() {
        let (stream, key) = stream(Duration::from_secs(30)).await;
        assert_eq!(stream.pending_count(GROUP).await.unwrap(), 0);
        drop_key(&key).await;
    }

    // ==================== Lease Tests ====================

    #[tokio::test]
    #[ignore]
    async fn test_expired_lease_is_redelivered() {
        let lease = Duration::from_millis(200);
        let (stream, key) = stream(lease).await;
        stream.publish(&Job { n: 7 }).await.unwrap();

        let first = stream.read_group(GROUP, "crashed", 1, NO_WAIT).await.unwrap();
        assert_eq!(first.len(), 1);

        // Still leased
        let none = stream.read_group(GROUP, "survivor", 1, NO_WAIT).await.unwrap();
        assert!(none.is_empty());

        tokio::time::sleep(lease + Duration::from_millis(100)).await;
        let again = stream.read_group(GROUP, "survivor", 1, NO_WAIT).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, first[0].id);
        assert_eq!(again[0].payload, Job { n: 7 });
        assert_eq!(again[0].delivery_count, 2);

        assert!(stream.ack(GROUP, &again[0].id).await.unwrap());
        tokio::time::sleep(lease + Duration::from_millis(100)).await;
        let after_ack = stream.read_group(GROUP, "survivor", 1, NO_WAIT).await.unwrap();
        assert!(after_ack.is_empty());

        drop_key(&key).await;
    }

    #[tokio::test]
    #[ignore]
    async fn test_reclaim_skips_fresh_older_entries() {
        let lease = Duration::from_millis(300);
        let (stream, key) = stream(lease).await;
        stream.publish(&Job { n: 1 }).await.unwrap();
        stream.publish(&Job { n: 2 }).await.unwrap();

        let a = stream.read_group(GROUP, "worker-a", 1, NO_WAIT).await.unwrap();
        let b = stream.read_group(GROUP, "worker-b", 1, NO_WAIT).await.unwrap();
        assert_eq!(a[0].payload.n, 1);
        assert_eq!(b[0].payload.n, 2);

        tokio::time::sleep(lease + Duration::from_millis(100)).await;

        // Job 1 is reclaimed first; its idle time starts over
        let c = stream.read_group(GROUP, "worker-c", 1, NO_WAIT).await.unwrap();
        assert_eq!(c[0].payload.n, 1);

        // The oldest pending entry is now fresh, but job 2 is still expired
        let d = stream.read_group(GROUP, "worker-d", 1, NO_WAIT).await.unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].payload.n, 2);
        assert_eq!(d[0].delivery_count, 2);

        drop_key(&key).await;
    }
}
