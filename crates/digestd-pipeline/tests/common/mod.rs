//! In-memory fakes shared by the pipeline and batch driver tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digestd_core::{Digest, DigestContext, Frequency, Provider, QuerySet, RunStatus, Source};
use digestd_db::DbError;
use digestd_mailer::{EmailTransport, MailError, Mailer, OutgoingEmail};
use digestd_pipeline::{DigestStore, Pipeline};
use digestd_retrieval::{ProviderResponse, RawCitation, RetrievalError, Retriever};
use digestd_summarizer::{LanguageModel, SummarizeError, Summarizer};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: Uuid,
    pub digest_id: Uuid,
    pub run_at: DateTime<Utc>,
    /// Every status the run has held, in order.
    pub statuses: Vec<RunStatus>,
    pub error_message: Option<String>,
    pub email_sent_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn status(&self) -> RunStatus {
        *self.statuses.last().expect("runs always have a status")
    }
}

#[derive(Default)]
struct State {
    digests: HashMap<Uuid, Digest>,
    order: Vec<Uuid>,
    sources: HashMap<Uuid, Vec<Source>>,
    emails: HashMap<Uuid, String>,
    runs: Vec<RunRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    pub fail_run_writes: AtomicBool,
    /// Number of upcoming `complete_run` calls that fail.
    pub failing_completions: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub reap_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn add_digest(
        &self,
        name: &str,
        frequency: Frequency,
        last_run_at: Option<DateTime<Utc>>,
    ) -> Digest {
        self.add_digest_with(name, frequency, last_run_at, true)
    }

    pub fn add_digest_with(
        &self,
        name: &str,
        frequency: Frequency,
        last_run_at: Option<DateTime<Utc>>,
        active: bool,
    ) -> Digest {
        let user_id = Uuid::new_v4();
        let digest = Digest {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            description: None,
            frequency,
            active,
            last_run_at,
        };
        let mut state = self.state.lock().unwrap();
        state
            .emails
            .insert(user_id, format!("{}@example.com", name.to_lowercase().replace(' ', ".")));
        state.order.push(digest.id);
        state.digests.insert(digest.id, digest.clone());
        digest
    }

    pub fn add_source(&self, digest_id: Uuid, source_type: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.sources.entry(digest_id).or_default().push(Source {
            id: Uuid::new_v4(),
            digest_id,
            source_type: source_type.to_string(),
            source_value: value.to_string(),
        });
    }

    pub fn remove_email(&self, user_id: Uuid) {
        self.state.lock().unwrap().emails.remove(&user_id);
    }

    pub fn email_of(&self, user_id: Uuid) -> Option<String> {
        self.state.lock().unwrap().emails.get(&user_id).cloned()
    }

    pub fn digest(&self, id: Uuid) -> Digest {
        self.state.lock().unwrap().digests[&id].clone()
    }

    pub fn runs_for(&self, digest_id: Uuid) -> Vec<RunRecord> {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .filter(|r| r.digest_id == digest_id)
            .cloned()
            .collect()
    }

    pub fn run(&self, run_id: Uuid) -> RunRecord {
        self.state
            .lock()
            .unwrap()
            .runs
            .iter()
            .find(|r| r.id == run_id)
            .cloned()
            .expect("run exists")
    }

    fn transition(
        &self,
        run_id: Uuid,
        expected: RunStatus,
        next: RunStatus,
    ) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let invalid = DbError::InvalidRunTransition {
            id: run_id,
            expected_status: expected.as_str(),
        };
        let Some(run) = state.runs.iter_mut().find(|r| r.id == run_id) else {
            return Err(invalid);
        };
        if run.status() != expected || !expected.can_transition_to(next) {
            return Err(invalid);
        }
        run.statuses.push(next);
        Ok(())
    }
}

#[async_trait]
impl DigestStore for MemoryStore {
    async fn get_digest(&self, id: Uuid) -> Result<Option<Digest>, DbError> {
        Ok(self.state.lock().unwrap().digests.get(&id).cloned())
    }

    async fn list_active_digests(&self) -> Result<Vec<Digest>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .order
            .iter()
            .map(|id| state.digests[id].clone())
            .filter(|d| d.active)
            .collect())
    }

    async fn list_sources(&self, digest_id: Uuid) -> Result<Vec<Source>, DbError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .sources
            .get(&digest_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn user_email(&self, user_id: Uuid) -> Result<Option<String>, DbError> {
        Ok(self.email_of(user_id))
    }

    async fn create_run(&self, digest_id: Uuid, run_at: DateTime<Utc>) -> Result<Uuid, DbError> {
        let mut state = self.state.lock().unwrap();
        if state
            .runs
            .iter()
            .any(|r| r.digest_id == digest_id && !r.status().is_terminal())
        {
            return Err(DbError::RunInProgress { digest_id });
        }
        let id = Uuid::new_v4();
        state.runs.push(RunRecord {
            id,
            digest_id,
            run_at,
            statuses: vec![RunStatus::Queued],
            error_message: None,
            email_sent_at: None,
        });
        Ok(id)
    }

    async fn start_run(&self, run_id: Uuid) -> Result<(), DbError> {
        self.transition(run_id, RunStatus::Queued, RunStatus::Processing)
    }

    async fn complete_run(
        &self,
        run_id: Uuid,
        email_sent_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_run_writes.load(Ordering::SeqCst) {
            return Err(DbError::NotFound);
        }
        if self
            .failing_completions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DbError::NotFound);
        }
        self.transition(run_id, RunStatus::Processing, RunStatus::Completed)?;
        let mut state = self.state.lock().unwrap();
        let (digest_id, run_at) = {
            let run = state.runs.iter_mut().find(|r| r.id == run_id).unwrap();
            run.email_sent_at = Some(email_sent_at);
            (run.digest_id, run.run_at)
        };
        if let Some(digest) = state.digests.get_mut(&digest_id) {
            digest.last_run_at = Some(run_at);
        }
        Ok(())
    }

    async fn fail_run(&self, run_id: Uuid, error_message: &str) -> Result<(), DbError> {
        if self.fail_run_writes.load(Ordering::SeqCst) {
            return Err(DbError::NotFound);
        }
        self.transition(run_id, RunStatus::Processing, RunStatus::Failed)?;
        let mut state = self.state.lock().unwrap();
        let run = state.runs.iter_mut().find(|r| r.id == run_id).unwrap();
        run.error_message = Some(error_message.to_string());
        Ok(())
    }

    async fn reap_stale_runs(&self, _lease: Duration) -> Result<u64, DbError> {
        self.reap_calls.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

// ---------------------------------------------------------------------------
// Retriever
// ---------------------------------------------------------------------------

pub struct FakeRetriever {
    provider: Provider,
    response: Option<ProviderResponse>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<QuerySet>>,
}

impl FakeRetriever {
    pub fn citing(provider: Provider, text: &str, citations: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            provider,
            response: Some(ProviderResponse {
                text: text.to_string(),
                citations: citations
                    .iter()
                    .map(|(title, url)| RawCitation {
                        title: Some((*title).to_string()),
                        url: (*url).to_string(),
                        snippet: None,
                    })
                    .collect(),
            }),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(provider: Provider) -> Arc<Self> {
        Arc::new(Self {
            provider,
            response: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch(
        &self,
        queries: &QuerySet,
        _context: &DigestContext,
    ) -> Result<ProviderResponse, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(queries.clone());
        self.response.clone().ok_or(RetrievalError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

pub struct FakeModel {
    reply: String,
    pub calls: AtomicUsize,
}

impl FakeModel {
    pub fn replying(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, _prompt: &str) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub reject: AtomicBool,
}

impl Outbox {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailTransport for Outbox {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(MailError::Rejected {
                status: 422,
                body: "invalid recipient".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("msg_{}", sent.len()))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub const AI_SUMMARY: &str = r#"{
  "title": "AI News",
  "date": "3/1/2025",
  "sections": [{
    "title": "artificial intelligence",
    "items": [{
      "title": "AI breakthrough",
      "summary": "A lab reported a new result.",
      "url": "https://news.example/ai",
      "source_term": "artificial intelligence"
    }]
  }]
}"#;

pub fn ai_retriever() -> Arc<FakeRetriever> {
    FakeRetriever::citing(
        Provider::WebSearch,
        "Latest artificial intelligence research results.",
        &[("AI breakthrough", "https://news.example/ai")],
    )
}

pub fn build_pipeline(
    store: Arc<MemoryStore>,
    retrievers: Vec<Arc<dyn Retriever>>,
    model: Arc<FakeModel>,
    outbox: Arc<Outbox>,
) -> Pipeline {
    Pipeline::new(
        store,
        retrievers,
        Summarizer::new(model, Duration::from_secs(5)),
        Mailer::new(outbox, "digest@digest.wtf", Duration::from_secs(5)),
        Duration::from_secs(5),
    )
}
