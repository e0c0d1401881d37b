//! Source classification: raw source rows to per-provider query sets.
//!
//! Classification never fails. Sources with an unknown type or a blank value
//! are counted in [`ClassifiedSources::skipped`] and otherwise ignored, so one
//! malformed row cannot take down a whole digest.

use serde::Serialize;

use crate::digest::{Source, SourceKind};

/// A content provider capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    WebSearch,
    SocialSearch,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::WebSearch => "web_search",
            Provider::SocialSearch => "social_search",
        }
    }
}

/// Queries a single provider should run, in source order, de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuerySet {
    pub terms: Vec<String>,
    pub handles: Vec<String>,
    pub hashtags: Vec<String>,
}

impl QuerySet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.handles.is_empty() && self.hashtags.is_empty()
    }

    /// Candidate labels for citation attribution: terms, then handles, then
    /// hashtags. The first candidate is the deterministic fallback.
    pub fn attribution_candidates(&self) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .chain(&self.handles)
            .chain(&self.hashtags)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedSources {
    pub web_search: QuerySet,
    pub social_search: QuerySet,
    /// Sources dropped for an unknown type or an empty value.
    pub skipped: usize,
}

impl ClassifiedSources {
    #[must_use]
    pub fn for_provider(&self, provider: Provider) -> &QuerySet {
        match provider {
            Provider::WebSearch => &self.web_search,
            Provider::SocialSearch => &self.social_search,
        }
    }
}

/// Split a digest's sources into per-provider query sets.
///
/// `search_term` and `website` feed the web-search provider and are also
/// passed to the social provider as secondary context. `x_handle` and
/// `x_hashtag` feed only the social provider.
#[must_use]
pub fn classify_sources(sources: &[Source]) -> ClassifiedSources {
    let mut out = ClassifiedSources::default();

    for source in sources {
        let value = source.source_value.trim();
        let Some(kind) = source.kind().filter(|_| !value.is_empty()) else {
            out.skipped += 1;
            continue;
        };

        match kind {
            SourceKind::SearchTerm | SourceKind::Website => {
                push_unique(&mut out.web_search.terms, value);
                push_unique(&mut out.social_search.terms, value);
            }
            SourceKind::XHandle => push_unique(&mut out.social_search.handles, value),
            SourceKind::XHashtag => push_unique(&mut out.social_search.hashtags, value),
        }
    }

    out
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
