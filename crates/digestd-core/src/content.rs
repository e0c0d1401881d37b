//! In-memory retrieval results. Never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single attributed piece of retrieved content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// The query term, handle or hashtag this citation best matches.
    pub source_term: String,
}

/// Free-text provider output plus its ordered citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContent {
    pub content: String,
    pub citations: Vec<Citation>,
}

impl RetrievedContent {
    /// The shape every retriever returns for "nothing to report", whether
    /// because it had no queries or because the provider failed.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.citations.is_empty()
    }
}
