//! Command handlers, called from `main` once config and the pool exist.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use digestd_core::{group_due, AppConfig, Digest, Frequency};
use digestd_pipeline::{build_pipeline, DigestStore, PgStore, Recipient};
use sqlx::PgPool;
use uuid::Uuid;

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if any migration fails.
pub(crate) async fn run_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = digestd_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Print the digests a cycle started now would pick up.
///
/// # Errors
///
/// Returns an error if the digests cannot be loaded.
pub(crate) async fn run_due(pool: &PgPool) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone());
    let groups = group_due(store.list_active_digests().await?, Utc::now());
    print!("{}", format_due(&groups));
    Ok(())
}

/// Run a single digest now and report the outcome.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the run fails. A
/// failed run has already been recorded with its error message.
pub(crate) async fn run_digest(
    config: &AppConfig,
    pool: PgPool,
    digest_id: Uuid,
    email: Option<String>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, Arc::new(PgStore::new(pool)))?;
    let recipient = email.map_or(Recipient::DigestOwner, Recipient::Address);

    let receipt = pipeline
        .run_digest_once(digest_id, Utc::now(), &recipient)
        .await?;

    println!(
        "run {} sent {} item(s) as message {}",
        receipt.run_id, receipt.items, receipt.message_id
    );
    if !receipt.recorded {
        eprintln!("warning: the email was sent but the run could not be marked completed");
    }
    Ok(())
}

/// Run one batch cycle and print its report as JSON.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or active digests
/// cannot be listed. Per-digest failures are part of the report.
pub(crate) async fn run_cycle(config: &AppConfig, pool: PgPool) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, Arc::new(PgStore::new(pool)))?;
    let report = digestd_pipeline::run_cycle(
        pipeline.store().as_ref(),
        &pipeline,
        &config.batch_config(),
        Utc::now(),
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn format_due(groups: &BTreeMap<Frequency, Vec<Digest>>) -> String {
    if groups.is_empty() {
        return "no digests are due\n".to_string();
    }

    let mut out = String::new();
    for (frequency, digests) in groups {
        let _ = writeln!(out, "{frequency} ({})", digests.len());
        for digest in digests {
            let last_run = digest
                .last_run_at
                .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string());
            let _ = writeln!(
                out,
                "  {}  {:<32}  last run: {last_run}",
                digest.id, digest.name
            );
        }
    }
    out
}
