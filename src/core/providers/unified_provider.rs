//! Unified Provider Error Handling
//!
//! Single error type for every provider adapter.
//!
//! | Variant | Purpose | HTTP Status | Transient |
//! |------|------|------------|--------|
//! | Authentication | Credentials rejected | 401/403 | No |
//! | RateLimit | Vendor throttled the call | 429 | Yes |
//! | ModelNotFound | Vendor does not know the model | 404 | No |
//! | InvalidRequest | Malformed prompt or parameters | 400 | No |
//! | Network | Connection failure | - | Yes |
//! | Timeout | Call exceeded its deadline | - | Yes |
//! | ApiError | Any other status code | 4xx/5xx | 429 and 5xx only |
//! | ProviderUnavailable | Vendor overloaded / down | 503 | Yes |
//! | ResponseParsing | Body did not match the wire format | - | No |
//! | Configuration | Adapter is misconfigured | - | No |
//!
//! ## Usage
//!
//! ```rust
//! use docqa_gateway::core::providers::ProviderError;
//!
//! let err = ProviderError::from_status("openai", 503, "upstream overloaded");
//! assert!(err.is_transient());
//!
//! let err = ProviderError::authentication("anthropic", "Invalid API key");
//! assert!(!err.is_transient());
//! ```

/// Unified provider error type - single error for all providers
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Authentication failed for {provider}: {message}")]
    Authentication {
        provider: &'static str,
        message: String,
    },

    #[error("Rate limit exceeded for {provider}: {message}")]
    RateLimit {
        provider: &'static str,
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Model '{model}' not found for {provider}")]
    ModelNotFound {
        provider: &'static str,
        model: String,
    },

    #[error("Invalid request for {provider}: {message}")]
    InvalidRequest {
        provider: &'static str,
        message: String,
    },

    #[error("Network error for {provider}: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("Timeout for {provider}: {message}")]
    Timeout {
        provider: &'static str,
        message: String,
    },

    /// API error with status code
    #[error("API error for {provider} (status {status}): {message}")]
    ApiError {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Provider {provider} is unavailable: {message}")]
    ProviderUnavailable {
        provider: &'static str,
        message: String,
    },

    #[error("Failed to parse {provider} response: {message}")]
    ResponseParsing {
        provider: &'static str,
        message: String,
    },

    #[error("Configuration error for {provider}: {message}")]
    Configuration {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Create authentication error
    pub fn authentication(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
        }
    }

    /// Create rate limit error
    pub fn rate_limit(provider: &'static str, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            provider,
            message: match retry_after {
                Some(seconds) => format!("Rate limit exceeded. Retry after {} seconds", seconds),
                None => "Rate limit exceeded".to_string(),
            },
            retry_after,
        }
    }

    /// Create model not found error
    pub fn model_not_found(provider: &'static str, model: impl Into<String>) -> Self {
        Self::ModelNotFound {
            provider,
            model: model.into(),
        }
    }

    /// Create invalid request error
    pub fn invalid_request(provider: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider,
            message: message.into(),
        }
    }

    /// Create network error
    pub fn network(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            provider,
            message: message.into(),
        }
    }

    /// Create timeout error
    pub fn timeout(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Timeout {
            provider,
            message: message.into(),
        }
    }

    /// Create API error with status code
    pub fn api_error(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Create provider unavailable error
    pub fn provider_unavailable(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider,
            message: message.into(),
        }
    }

    /// Create response parsing error
    pub fn response_parsing(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ResponseParsing {
            provider,
            message: message.into(),
        }
    }

    /// Create configuration error
    pub fn configuration(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider,
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status from a vendor into an error.
    ///
    /// Shared by every adapter so that the transient/permanent split is the
    /// same regardless of vendor.
    pub fn from_status(provider: &'static str, status: u16, body: &str) -> Self {
        match status {
            400 | 413 | 422 => Self::invalid_request(provider, format!("Bad request: {}", body)),
            401 => Self::authentication(provider, "Invalid or missing API key"),
            403 => Self::authentication(provider, "Forbidden: insufficient permissions"),
            404 => Self::model_not_found(provider, body),
            429 => Self::rate_limit(provider, extract_retry_after(body)),
            502..=504 => Self::provider_unavailable(provider, format!("Upstream error: {}", body)),
            500..=599 => Self::api_error(provider, status, format!("Server error: {}", body)),
            _ => Self::api_error(provider, status, body),
        }
    }

    /// Get the provider name that caused this error
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Authentication { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::ModelNotFound { provider, .. }
            | Self::InvalidRequest { provider, .. }
            | Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::ApiError { provider, .. }
            | Self::ProviderUnavailable { provider, .. }
            | Self::ResponseParsing { provider, .. }
            | Self::Configuration { provider, .. } => provider,
        }
    }

    /// Whether the failure is transient and the call may be retried.
    ///
    /// Timeouts, connection failures, vendor throttling and 5xx-equivalents
    /// are transient; authentication, malformed prompts and other 4xx are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::RateLimit { .. }
            | Self::ProviderUnavailable { .. } => true,

            Self::ApiError { status, .. } => matches!(*status, 429 | 500..=599),

            Self::Authentication { .. }
            | Self::ModelNotFound { .. }
            | Self::InvalidRequest { .. }
            | Self::ResponseParsing { .. }
            | Self::Configuration { .. } => false,
        }
    }

    /// Suggested delay in seconds before retrying, when the vendor gave one
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Authentication { .. } => 401,
            Self::RateLimit { .. } => 429,
            Self::ModelNotFound { .. } => 404,
            Self::InvalidRequest { .. } => 400,
            Self::ApiError { status, .. } => *status,
            Self::ProviderUnavailable { .. } => 503,
            Self::Timeout { .. } => 504,
            Self::Network { .. }
            | Self::ResponseParsing { .. }
            | Self::Configuration { .. } => 502,
        }
    }
}

/// Extract a retry-after hint from a vendor error body
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .or_else(|| json.get("error").and_then(|e| e.get("retry_after")))
        .and_then(|v| v.as_u64())
}
