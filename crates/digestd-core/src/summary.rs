//! Structured digest output produced by the summarizer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSummary {
    pub title: String,
    pub date: String,
    pub sections: Vec<SummarySection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySection {
    pub title: String,
    pub items: Vec<SummaryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryItem {
    pub title: String,
    /// One or two sentences.
    pub summary: String,
    pub url: String,
    pub source_term: String,
}

impl DigestSummary {
    /// An empty digest is a valid, sendable outcome.
    #[must_use]
    pub fn empty(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

/// `M/D/YYYY` without zero padding, as used in digest titles and subjects.
#[must_use]
pub fn display_date(date: NaiveDate) -> String {
    date.format("%-m/%-d/%Y").to_string()
}
