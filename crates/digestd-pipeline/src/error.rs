use digestd_db::DbError;
use digestd_mailer::MailError;
use digestd_retrieval::RetrievalError;
use digestd_summarizer::SummarizeError;
use thiserror::Error;
use uuid::Uuid;

/// Why a run failed. The `Display` text is what lands in the run's
/// `error_message`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Digest not found: {0}")]
    DigestNotFound(Uuid),

    #[error("User email not found for user {0}")]
    RecipientNotFound(Uuid),

    #[error("No sources found for digest")]
    NoSources,

    #[error("digest {0} already has a run in progress")]
    RunInProgress(Uuid),

    #[error("summarization failed: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] MailError),

    #[error("store error: {0}")]
    Store(DbError),
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::RunInProgress { digest_id } => PipelineError::RunInProgress(digest_id),
            other => PipelineError::Store(other),
        }
    }
}

impl PipelineError {
    /// Whether the batch driver should try this digest again in the same
    /// cycle. Another invocation holding the digest is the only hard stop.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        !matches!(self, PipelineError::RunInProgress(_))
    }
}

/// Failures while wiring a [`crate::Pipeline`] from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("ANTHROPIC_API_KEY is required to build the summarizer")]
    MissingSummarizer,

    #[error("RESEND_API_KEY is required to deliver digests")]
    MissingEmailTransport,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error(transparent)]
    Mail(#[from] MailError),
}
