use std::time::Duration;

use thiserror::Error;

/// Errors a provider call can produce. None of these escape
/// [`crate::retrieve`]; they are logged and turned into an empty result.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("provider call exceeded {0:?}")]
    Timeout(Duration),
}
