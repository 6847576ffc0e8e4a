//! Utility modules for the gateway
//!
//! - **error**: error taxonomy, retry and circuit breaking
//! - **logging**: tracing subscriber setup

pub mod error;
pub mod logging;
