//! Error handling for the Gateway
//!
//! This module defines all error types used throughout the gateway.

#![allow(missing_docs)]

use crate::core::cost::CostError;
use crate::core::providers::unified_provider::ProviderError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for the Gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the Gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bad input, caught before anything is enqueued
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown document or request identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// Pricing/configuration gap for a model
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Vendor call failed
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// No rate-limit permit could be acquired in time
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Circuit breaker is open for the provider
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// No response within the caller's wait
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Request stream faults
    #[error("Stream error: {0}")]
    Stream(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Stable, actionable error codes carried in every failure payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    UnknownModel,
    ProviderError,
    ProviderAuthError,
    RateLimited,
    ProviderUnavailable,
    Timeout,
    ConfigError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status reflecting the error taxonomy
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UnknownModel => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::ProviderAuthError => StatusCode::UNAUTHORIZED,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::ConfigError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Structured error payload: `{errorCode, message}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub error_code: ErrorCode,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    /// Render the payload as an HTTP response
    pub fn to_http_response(&self) -> HttpResponse {
        HttpResponse::build(self.error_code.status_code()).json(self)
    }
}

impl GatewayError {
    /// Error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::Config(_) => ErrorCode::ConfigError,
            GatewayError::Validation(_) => ErrorCode::ValidationError,
            GatewayError::NotFound(_) => ErrorCode::NotFound,
            GatewayError::UnknownModel(_) => ErrorCode::UnknownModel,
            GatewayError::Provider(ProviderError::Authentication { .. }) => {
                ErrorCode::ProviderAuthError
            }
            GatewayError::Provider(_) => ErrorCode::ProviderError,
            GatewayError::RateLimited(_) => ErrorCode::RateLimited,
            GatewayError::ProviderUnavailable(_) => ErrorCode::ProviderUnavailable,
            GatewayError::Timeout(_) => ErrorCode::Timeout,
            GatewayError::Stream(_)
            | GatewayError::Internal(_)
            | GatewayError::Serialization(_)
            | GatewayError::Io(_) => ErrorCode::InternalError,
            #[cfg(feature = "redis")]
            GatewayError::Redis(_) => ErrorCode::InternalError,
        }
    }

    /// Structured payload for this error
    pub fn detail(&self) -> ErrorDetail {
        let message = match self {
            // Storage internals are not user-actionable
            GatewayError::Io(_) | GatewayError::Stream(_) => {
                "An internal error occurred".to_string()
            }
            #[cfg(feature = "redis")]
            GatewayError::Redis(_) => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };
        ErrorDetail::new(self.code(), message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal(message.into())
    }

    pub fn stream(message: impl Into<String>) -> Self {
        GatewayError::Stream(message.into())
    }
}

impl From<ProviderError> for GatewayError {
    fn from(err: ProviderError) -> Self {
        GatewayError::Provider(err)
    }
}

impl From<CostError> for GatewayError {
    fn from(err: CostError) -> Self {
        match err {
            CostError::UnknownModel { .. } => GatewayError::UnknownModel(err.to_string()),
            CostError::InvalidPricing { .. } => GatewayError::Config(err.to_string()),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        self.code().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        self.detail().to_http_response()
    }
}
