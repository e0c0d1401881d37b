use std::time::Duration;

use thiserror::Error;

/// Every variant is fatal for the run that hit it.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("language model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("language model call exceeded {0:?}")]
    Timeout(Duration),

    #[error("language model returned no text")]
    EmptyCompletion,

    /// The completion did not contain a parseable JSON object.
    #[error("malformed summary: {0}")]
    Malformed(String),

    /// The JSON parsed but is missing required fields.
    #[error("invalid summary format from language model: {0}")]
    Invalid(String),
}
