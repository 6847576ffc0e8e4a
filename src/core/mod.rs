//! Core functionality for the gateway
//!
//! Provider adapters, cost accounting, the request stream, the dispatcher
//! and the request-facing gateway.

pub mod correlation;
pub mod cost;
pub mod dispatcher;
pub mod documents;
pub mod gateway;
pub mod orchestrator;
pub mod providers;
pub mod requests;
pub mod stream;
