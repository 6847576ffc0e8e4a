//! Integration tests for docqa-gateway
//!
//! These tests drive requests through the public API of the crate: the
//! gateway, the request stream, the dispatcher pool and the HTTP surface.

pub mod config_tests;
pub mod http_tests;
pub mod pipeline_tests;
pub mod provider_wire_tests;
pub mod redelivery_tests;
pub mod redis_stream_tests;
