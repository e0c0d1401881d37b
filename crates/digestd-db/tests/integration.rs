//! Offline tests for digestd-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use chrono::Utc;
use digestd_core::{AppConfig, Digest, Environment, Frequency, RunStatus, Source, SourceKind};
use digestd_db::{DbError, DigestRow, DigestRunRow, DigestSourceRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        api_keys: Vec::new(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        web_search: None,
        social_search: None,
        summarizer: None,
        resend_api_key: None,
        resend_base_url: "https://api.resend.com".to_string(),
        email_from: "digest@digest.wtf".to_string(),
        retrieval_timeout_secs: 90,
        summary_timeout_secs: 120,
        email_timeout_secs: 30,
        batch_size: 10,
        max_attempts: 3,
        backoff_base_secs: 1,
        batch_delay_ms: 1000,
        run_lease_secs: 1800,
        cron: "0 0 * * * *".to_string(),
    }
}

fn digest_row(frequency: &str, description: Option<&str>) -> DigestRow {
    DigestRow {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "AI News".to_string(),
        description: description.map(str::to_string),
        frequency: frequency.to_string(),
        active: true,
        last_run_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn digest_row_converts_to_domain_digest() {
    let row = digest_row("daily", Some("machine learning research"));
    let id = row.id;

    let digest = Digest::try_from(row).expect("daily is a valid frequency");
    assert_eq!(digest.id, id);
    assert_eq!(digest.frequency, Frequency::Daily);
    assert_eq!(
        digest.description.as_deref(),
        Some("machine learning research")
    );
}

#[test]
fn blank_description_is_treated_as_absent() {
    let digest = Digest::try_from(digest_row("weekly", Some("   "))).expect("valid row");
    assert!(digest.description.is_none());
}

#[test]
fn unknown_frequency_fails_conversion() {
    let err = Digest::try_from(digest_row("monthly", None)).expect_err("monthly is not allowed");
    assert!(matches!(err, DbError::Decode(_)));
}

#[test]
fn source_row_keeps_raw_type_for_classification() {
    let row = DigestSourceRow {
        id: Uuid::new_v4(),
        digest_id: Uuid::new_v4(),
        source_type: "x_handle".to_string(),
        source_value: "@OpenAI".to_string(),
        created_at: Utc::now(),
    };

    let source = Source::from(row);
    assert_eq!(source.kind(), Some(SourceKind::XHandle));
    assert_eq!(source.source_value, "@OpenAI");
}

#[test]
fn run_row_parses_status() {
    let row = DigestRunRow {
        id: Uuid::new_v4(),
        digest_id: Uuid::new_v4(),
        status: "processing".to_string(),
        run_at: Utc::now(),
        started_at: Some(Utc::now()),
        completed_at: None,
        email_sent_at: None,
        error_message: None,
    };
    assert_eq!(row.status().expect("known status"), RunStatus::Processing);

    let bogus = DigestRunRow {
        status: "paused".to_string(),
        ..row
    };
    assert!(matches!(bogus.status(), Err(DbError::Decode(_))));
}
