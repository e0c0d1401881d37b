//! Digest processing pipeline and batch driver.
//!
//! [`Pipeline`] runs one digest end to end and records the run's lifecycle
//! through a [`DigestStore`]. [`run_cycle`] selects due digests and drives
//! the pipeline over them with bounded concurrency and retry.

mod batch;
mod error;
mod pipeline;
mod retry;
mod store;
mod tracker;

use std::sync::Arc;
use std::time::Duration;

use digestd_core::AppConfig;
use digestd_mailer::{Mailer, ResendTransport};
use digestd_retrieval::{Retriever, SocialSearchClient, WebSearchClient};
use digestd_summarizer::{AnthropicClient, Summarizer};

pub use batch::{run_cycle, CycleReport, DigestExecutor};
pub use error::{PipelineError, SetupError};
pub use pipeline::{Pipeline, Recipient, RunReceipt};
pub use retry::retry_with_backoff;
pub use store::{DigestStore, PgStore};

/// Wire a [`Pipeline`] from configuration.
///
/// Search providers without an API key are left out. The summarizer and the
/// email transport are required.
///
/// # Errors
///
/// Returns [`SetupError`] if a required collaborator is unconfigured or an
/// HTTP client cannot be built.
pub fn build_pipeline(
    config: &AppConfig,
    store: Arc<dyn DigestStore>,
) -> Result<Pipeline, SetupError> {
    let retrieval_timeout = Duration::from_secs(config.retrieval_timeout_secs);

    let mut retrievers: Vec<Arc<dyn Retriever>> = Vec::new();
    if let Some(endpoint) = &config.web_search {
        retrievers.push(Arc::new(WebSearchClient::new(endpoint, retrieval_timeout)?));
    }
    if let Some(endpoint) = &config.social_search {
        retrievers.push(Arc::new(SocialSearchClient::new(endpoint, retrieval_timeout)?));
    }
    if retrievers.is_empty() {
        tracing::warn!("no search providers configured; every digest will be empty");
    }

    let summary_timeout = Duration::from_secs(config.summary_timeout_secs);
    let model = config
        .summarizer
        .as_ref()
        .ok_or(SetupError::MissingSummarizer)?;
    let summarizer = Summarizer::new(
        Arc::new(AnthropicClient::new(model, summary_timeout)?),
        summary_timeout,
    );

    let email_timeout = Duration::from_secs(config.email_timeout_secs);
    let resend_key = config
        .resend_api_key
        .as_deref()
        .ok_or(SetupError::MissingEmailTransport)?;
    let transport = ResendTransport::new(resend_key, &config.resend_base_url, email_timeout)?;
    let mailer = Mailer::new(Arc::new(transport), config.email_from.clone(), email_timeout);

    Ok(Pipeline::new(
        store,
        retrievers,
        summarizer,
        mailer,
        retrieval_timeout,
    ))
}
