//! Error Handling utilities
//!
//! This module provides the gateway error taxonomy and recovery patterns.

pub mod error;
pub mod recovery;

// Re-export commonly used types and functions
pub use error::*;
pub use recovery::*;
