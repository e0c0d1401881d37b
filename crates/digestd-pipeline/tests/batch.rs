mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use common::{ai_retriever, build_pipeline, FakeModel, MemoryStore, Outbox, AI_SUMMARY};
use digestd_core::{BatchConfig, Digest, Frequency, RunStatus};
use digestd_pipeline::{run_cycle, DigestExecutor, PipelineError};
use uuid::Uuid;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap()
}

fn config() -> BatchConfig {
    BatchConfig {
        batch_size: 10,
        max_attempts: 3,
        backoff_base: Duration::from_secs(1),
        batch_delay: Duration::from_secs(1),
        run_lease: Duration::from_secs(900),
    }
}

/// Fails each digest a scripted number of times before succeeding.
#[derive(Default)]
struct ScriptedExecutor {
    failures_before_success: Mutex<HashMap<Uuid, u32>>,
    always_busy: Mutex<Vec<Uuid>>,
    attempts: Mutex<HashMap<Uuid, u32>>,
    work: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedExecutor {
    fn fail_times(&self, digest_id: Uuid, times: u32) {
        self.failures_before_success
            .lock()
            .unwrap()
            .insert(digest_id, times);
    }

    fn attempts(&self, digest_id: Uuid) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&digest_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DigestExecutor for ScriptedExecutor {
    async fn execute(&self, digest: &Digest, _run_at: DateTime<Utc>) -> Result<(), PipelineError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(digest.id).or_default();
            *entry += 1;
            *entry
        };

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.always_busy.lock().unwrap().contains(&digest.id) {
            return Err(PipelineError::RunInProgress(digest.id));
        }
        let failures = self
            .failures_before_success
            .lock()
            .unwrap()
            .get(&digest.id)
            .copied()
            .unwrap_or(0);
        if attempt <= failures {
            Err(PipelineError::NoSources)
        } else {
            Ok(())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn only_active_due_digests_are_selected() {
    let store = MemoryStore::default();
    let never_run = store.add_digest("Weekly New", Frequency::Weekly, None);
    let _fresh = store.add_digest(
        "Daily Fresh",
        Frequency::Daily,
        Some(now() - TimeDelta::hours(23)),
    );
    let boundary = store.add_digest(
        "Hourly Boundary",
        Frequency::Hourly,
        Some(now() - TimeDelta::hours(1)),
    );
    let _inactive = store.add_digest_with("Paused", Frequency::Hourly, None, false);

    let executor = ScriptedExecutor::default();
    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();

    // Every active digest is counted; only the due ones run.
    assert_eq!(report.total_digests, 3);
    assert!(report.failed_digests.is_empty());
    // Hourly group runs before weekly.
    assert_eq!(report.processed_digests, vec![boundary.id, never_run.id]);
    assert_eq!(store.reap_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn digest_that_recovers_on_third_attempt_is_processed() {
    let store = MemoryStore::default();
    let digest = store.add_digest("Flaky", Frequency::Daily, None);

    let executor = ScriptedExecutor::default();
    executor.fail_times(digest.id, 2);

    let started = tokio::time::Instant::now();
    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();

    assert_eq!(report.processed_digests, vec![digest.id]);
    assert!(report.failed_digests.is_empty());
    assert_eq!(executor.attempts(digest.id), 3);
    // 2s after the first failure, 4s after the second.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(6), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(7), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn exhausted_digest_is_reported_and_cycle_continues() {
    let store = MemoryStore::default();
    let broken = store.add_digest("Broken", Frequency::Daily, None);
    let healthy = store.add_digest("Healthy", Frequency::Daily, None);

    let executor = ScriptedExecutor::default();
    executor.fail_times(broken.id, u32::MAX);

    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();

    assert_eq!(report.total_digests, 2);
    assert_eq!(report.processed_digests, vec![healthy.id]);
    assert_eq!(report.failed_digests, vec![broken.id]);
    assert_eq!(executor.attempts(broken.id), 3);
    assert_eq!(executor.attempts(healthy.id), 1);
}

#[tokio::test(start_paused = true)]
async fn busy_digest_is_not_retried() {
    let store = MemoryStore::default();
    let busy = store.add_digest("Busy", Frequency::Hourly, None);

    let executor = ScriptedExecutor::default();
    executor.always_busy.lock().unwrap().push(busy.id);

    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();

    assert_eq!(report.failed_digests, vec![busy.id]);
    assert_eq!(executor.attempts(busy.id), 1);
}

#[tokio::test(start_paused = true)]
async fn batches_are_bounded_and_spaced() {
    let store = MemoryStore::default();
    let ids: Vec<Uuid> = (0..25)
        .map(|i| store.add_digest(&format!("Digest {i}"), Frequency::Hourly, None).id)
        .collect();

    let executor = ScriptedExecutor {
        work: Duration::from_millis(100),
        ..ScriptedExecutor::default()
    };

    let started = tokio::time::Instant::now();
    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.total_digests, 25);
    assert_eq!(report.processed_digests, ids);
    assert_eq!(executor.peak_in_flight.load(Ordering::SeqCst), 10);
    // Three batches of work and two inter-batch delays.
    assert!(elapsed >= Duration::from_millis(2_300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2_500), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn no_delay_after_the_last_batch_of_a_group() {
    let store = MemoryStore::default();
    store.add_digest("Hourly", Frequency::Hourly, None);
    store.add_digest("Daily", Frequency::Daily, None);

    let executor = ScriptedExecutor::default();
    let started = tokio::time::Instant::now();
    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();

    assert_eq!(report.processed_digests.len(), 2);
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn empty_cycle_reports_zero() {
    let store = MemoryStore::default();
    let executor = ScriptedExecutor::default();

    let report = run_cycle(&store, &executor, &config(), now()).await.unwrap();

    assert_eq!(report.total_digests, 0);
    assert!(report.processed_digests.is_empty());
    assert!(report.failed_digests.is_empty());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total_digests"], 0);
    assert!(json["processed_digests"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn cycle_over_real_pipeline_records_each_attempt() {
    let store = Arc::new(MemoryStore::default());
    let ai = store.add_digest("AI News", Frequency::Daily, None);
    store.add_source(ai.id, "search_term", "artificial intelligence");
    let empty = store.add_digest("No Sources", Frequency::Daily, None);

    let outbox = Arc::new(Outbox::default());
    let pipeline = build_pipeline(
        store.clone(),
        vec![ai_retriever()],
        FakeModel::replying(AI_SUMMARY),
        outbox.clone(),
    );
    let config = BatchConfig {
        backoff_base: Duration::from_millis(1),
        ..config()
    };

    let report = run_cycle(store.as_ref(), &pipeline, &config, now())
        .await
        .unwrap();

    assert_eq!(report.processed_digests, vec![ai.id]);
    assert_eq!(report.failed_digests, vec![empty.id]);
    assert_eq!(outbox.sent().len(), 1);
    assert_eq!(store.digest(ai.id).last_run_at, Some(now()));

    // One failed run per attempt, each carrying the error message.
    let failed_runs = store.runs_for(empty.id);
    assert_eq!(failed_runs.len(), 3);
    for run in &failed_runs {
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.run_at, now());
        assert_eq!(
            run.error_message.as_deref(),
            Some("No sources found for digest")
        );
    }
    assert_eq!(store.digest(empty.id).last_run_at, None);

    // A second cycle at the same instant finds nothing new to do for AI News.
    let again = run_cycle(store.as_ref(), &pipeline, &config, now())
        .await
        .unwrap();
    assert_eq!(again.total_digests, 2);
    assert!(again.processed_digests.is_empty());
    assert_eq!(again.failed_digests, vec![empty.id]);
}
