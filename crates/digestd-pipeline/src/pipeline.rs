//! One digest run: classify, retrieve, summarize, deliver, record.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digestd_core::{classify_sources, Digest};
use digestd_mailer::Mailer;
use digestd_retrieval::{retrieve_all, Retriever};
use digestd_summarizer::Summarizer;
use uuid::Uuid;

use crate::batch::DigestExecutor;
use crate::error::PipelineError;
use crate::store::DigestStore;
use crate::tracker::{complete_run_best_effort, fail_run_best_effort};

/// Who receives the digest email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Resolve the owning user's address from the store.
    DigestOwner,
    Address(String),
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReceipt {
    pub run_id: Uuid,
    pub message_id: String,
    pub items: usize,
    /// `false` when the email went out but the completion write failed twice;
    /// the run is left `processing` until the lease reaper closes it.
    pub recorded: bool,
}

pub struct Pipeline {
    store: Arc<dyn DigestStore>,
    retrievers: Vec<Arc<dyn Retriever>>,
    summarizer: Summarizer,
    mailer: Mailer,
    retrieval_deadline: Duration,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn DigestStore>,
        retrievers: Vec<Arc<dyn Retriever>>,
        summarizer: Summarizer,
        mailer: Mailer,
        retrieval_deadline: Duration,
    ) -> Self {
        Self {
            store,
            retrievers,
            summarizer,
            mailer,
            retrieval_deadline,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DigestStore> {
        &self.store
    }

    /// Process an existing `queued` run.
    ///
    /// The run moves to `processing` first. Any later failure marks the run
    /// `failed` with the error's message before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for any fatal step.
    pub async fn process(
        &self,
        digest_id: Uuid,
        run_id: Uuid,
        recipient: &Recipient,
    ) -> Result<RunReceipt, PipelineError> {
        self.store.start_run(run_id).await?;
        tracing::info!(%digest_id, %run_id, "digest run started");

        match self.run_steps(digest_id, recipient).await {
            Ok((message_id, items)) => {
                let recorded =
                    complete_run_best_effort(self.store.as_ref(), run_id, Utc::now()).await;
                tracing::info!(%digest_id, %run_id, items, "digest run completed");
                Ok(RunReceipt {
                    run_id,
                    message_id,
                    items,
                    recorded,
                })
            }
            Err(err) => {
                tracing::error!(%digest_id, %run_id, error = %err, "digest run failed");
                fail_run_best_effort(self.store.as_ref(), run_id, &err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Create a run for `digest_id` at `run_at` and process it.
    ///
    /// Creating the run takes the per-digest lease, so a concurrent
    /// invocation for the same digest fails fast with
    /// [`PipelineError::RunInProgress`] and leaves no run behind.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DigestNotFound`] without creating a run when
    /// the digest does not exist, otherwise whatever [`Pipeline::process`]
    /// returns.
    pub async fn run_digest_once(
        &self,
        digest_id: Uuid,
        run_at: DateTime<Utc>,
        recipient: &Recipient,
    ) -> Result<RunReceipt, PipelineError> {
        if self.store.get_digest(digest_id).await?.is_none() {
            return Err(PipelineError::DigestNotFound(digest_id));
        }
        let run_id = self.store.create_run(digest_id, run_at).await?;
        self.process(digest_id, run_id, recipient).await
    }

    async fn run_steps(
        &self,
        digest_id: Uuid,
        recipient: &Recipient,
    ) -> Result<(String, usize), PipelineError> {
        let digest = self
            .store
            .get_digest(digest_id)
            .await?
            .ok_or(PipelineError::DigestNotFound(digest_id))?;

        let address = match recipient {
            Recipient::Address(address) => address.clone(),
            Recipient::DigestOwner => self
                .store
                .user_email(digest.user_id)
                .await?
                .ok_or(PipelineError::RecipientNotFound(digest.user_id))?,
        };

        let sources = self.store.list_sources(digest_id).await?;
        if sources.is_empty() {
            return Err(PipelineError::NoSources);
        }

        let classified = classify_sources(&sources);
        if classified.skipped > 0 {
            tracing::warn!(
                %digest_id,
                skipped = classified.skipped,
                "ignoring sources with unknown type or empty value"
            );
        }

        let contents = retrieve_all(
            &self.retrievers,
            &classified,
            &digest.context(),
            self.retrieval_deadline,
        )
        .await;

        let today = Utc::now().date_naive();
        let summary = self.summarizer.summarize(&contents, today).await?;
        let items = summary.item_count();

        let message_id = self
            .mailer
            .deliver(&address, &digest.name, &summary, today)
            .await?;

        Ok((message_id, items))
    }
}

#[async_trait]
impl DigestExecutor for Pipeline {
    async fn execute(&self, digest: &Digest, run_at: DateTime<Utc>) -> Result<(), PipelineError> {
        let run_id = self.store.create_run(digest.id, run_at).await?;
        self.process(digest.id, run_id, &Recipient::DigestOwner)
            .await
            .map(|_| ())
    }
}
