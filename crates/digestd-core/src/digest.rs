//! Digest, source and run vocabulary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// How often a digest is delivered.
///
/// Variant order is the iteration order used when grouping due digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
}

impl Frequency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }

    /// Minimum elapsed time since the last successful run before the digest
    /// is due again. Also used as the retrieval recency window.
    #[must_use]
    pub fn interval(self) -> TimeDelta {
        match self {
            Frequency::Hourly => TimeDelta::hours(1),
            Frequency::Daily => TimeDelta::hours(24),
            Frequency::Weekly => TimeDelta::hours(168),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(CoreError::InvalidFrequency(other.to_string())),
        }
    }
}

/// The closed set of source kinds a digest can monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    SearchTerm,
    Website,
    XHandle,
    XHashtag,
}

impl SourceKind {
    /// Parses the persisted `source_type` column. Unknown or empty values
    /// return `None`; callers skip those sources rather than failing.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "search_term" => Some(SourceKind::SearchTerm),
            "website" => Some(SourceKind::Website),
            "x_handle" => Some(SourceKind::XHandle),
            "x_hashtag" => Some(SourceKind::XHashtag),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::SearchTerm => "search_term",
            SourceKind::Website => "website",
            SourceKind::XHandle => "x_handle",
            SourceKind::XHashtag => "x_hashtag",
        }
    }
}

/// Lifecycle state of a single digest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Processing => "processing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// The only legal edges are `queued -> processing` and
    /// `processing -> completed | failed`.
    #[must_use]
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Queued, RunStatus::Processing)
                | (RunStatus::Processing, RunStatus::Completed | RunStatus::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RunStatus::Queued),
            "processing" => Ok(RunStatus::Processing),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(CoreError::InvalidRunStatus(other.to_string())),
        }
    }
}

/// A user-defined, scheduled content aggregation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Digest {
    #[must_use]
    pub fn context(&self) -> DigestContext {
        DigestContext {
            description: self.description.clone(),
            frequency: self.frequency,
        }
    }
}

/// One monitored input attached to a digest.
///
/// `source_type` is kept as the raw persisted string so that malformed rows
/// survive loading and are dropped by the classifier instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub digest_id: Uuid,
    pub source_type: String,
    pub source_value: String,
}

impl Source {
    #[must_use]
    pub fn kind(&self) -> Option<SourceKind> {
        SourceKind::parse(&self.source_type)
    }
}

/// The slice of a digest the retrievers need to shape their prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestContext {
    pub description: Option<String>,
    pub frequency: Frequency,
}
