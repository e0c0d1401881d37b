//! Domain types and pure logic shared by every digestd crate.
//!
//! Nothing in here performs I/O: the classifier, due-selection and config
//! parsing are all deterministic functions over plain values.

pub mod app_config;
pub mod classify;
pub mod config;
pub mod content;
pub mod digest;
pub mod schedule;
pub mod summary;

use thiserror::Error;

pub use app_config::{ApiEndpoint, AppConfig, BatchConfig, Environment};
pub use classify::{classify_sources, ClassifiedSources, Provider, QuerySet};
pub use config::{load_app_config, load_app_config_from_env};
pub use content::{Citation, RetrievedContent};
pub use digest::{Digest, DigestContext, Frequency, RunStatus, Source, SourceKind};
pub use schedule::{group_due, is_due};
pub use summary::{display_date, DigestSummary, SummaryItem, SummarySection};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),
    #[error("invalid run status: {0}")]
    InvalidRunStatus(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
