use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport answered with a non-2xx status.
    #[error("email rejected with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("email dispatch exceeded {0:?}")]
    Timeout(Duration),
}
