//! Merge retrieved content into a validated [`DigestSummary`].
//!
//! Unlike retrieval, every failure here is fatal for the run: a transport
//! error, a timeout, or a reply that does not satisfy the summary schema all
//! surface as [`SummarizeError`].

mod error;
mod model;
mod parse;
mod prompt;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use digestd_core::{display_date, DigestSummary, RetrievedContent};

pub use error::SummarizeError;
pub use model::{AnthropicClient, LanguageModel};

const EMPTY_DIGEST_TITLE: &str = "Daily Digest";

pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    deadline: Duration,
}

impl Summarizer {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, deadline: Duration) -> Self {
        Self { model, deadline }
    }

    /// Summarize all provider output for one run.
    ///
    /// When there is no content or no citation at all, returns an empty
    /// "Daily Digest" dated `today` without calling the model.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizeError`] if the model call fails or times out, or if
    /// the reply is not a valid summary.
    pub async fn summarize(
        &self,
        contents: &[RetrievedContent],
        today: NaiveDate,
    ) -> Result<DigestSummary, SummarizeError> {
        let has_text = contents.iter().any(|c| !c.content.trim().is_empty());
        let has_citations = contents.iter().any(|c| !c.citations.is_empty());
        if !has_text || !has_citations {
            tracing::info!(has_text, has_citations, "nothing retrieved, producing empty digest");
            return Ok(DigestSummary::empty(EMPTY_DIGEST_TITLE, display_date(today)));
        }

        let prompt = prompt::summary_prompt(contents);
        let text = tokio::time::timeout(self.deadline, self.model.complete(&prompt))
            .await
            .map_err(|_| SummarizeError::Timeout(self.deadline))??;

        let summary = parse::parse_summary(&text)?;
        Ok(retain_traceable(summary, contents))
    }
}

/// Drop items whose URL is not among the retrieved citations, then drop
/// sections left empty. Blank item `source_term`s are filled from the
/// matching citation, and blank section titles from their first item.
fn retain_traceable(mut summary: DigestSummary, contents: &[RetrievedContent]) -> DigestSummary {
    let citations: HashMap<&str, &str> = contents
        .iter()
        .flat_map(|c| &c.citations)
        .map(|c| (c.url.as_str(), c.source_term.as_str()))
        .collect();

    for section in &mut summary.sections {
        section.items.retain_mut(|item| {
            let Some(source_term) = citations.get(item.url.as_str()) else {
                tracing::warn!(url = %item.url, "dropping summary item with untraceable URL");
                return false;
            };
            if item.source_term.is_empty() {
                item.source_term = (*source_term).to_string();
            }
            true
        });
        if section.title.is_empty() {
            if let Some(first) = section.items.first() {
                section.title.clone_from(&first.source_term);
            }
        }
    }
    summary.sections.retain(|s| !s.items.is_empty());

    summary
}
