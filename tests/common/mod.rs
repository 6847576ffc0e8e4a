//! Common test utilities for docqa-gateway
//!
//! - Scripted providers that play back timeouts, failures and answers
//! - A hand-wired pipeline (stream, dispatcher, gateway) with short leases
//!
//! # Usage
//!
//! ```rust
//! use crate::common::{fixtures::Pipeline, providers::{ScriptedProvider, Step}};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let provider = ScriptedProvider::new("openai", vec![Step::Hang]);
//!     let pipeline = Pipeline::builder(provider).start(2).await;
//!     // ...
//! }
//! ```

pub mod fixtures;
pub mod providers;

pub use fixtures::{Pipeline, PipelineBuilder};
pub use providers::{ScriptedProvider, Step};

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
