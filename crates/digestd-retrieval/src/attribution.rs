//! Citation attribution: which query term a citation belongs to.

use std::collections::HashSet;

use digestd_core::{Citation, QuerySet};

use crate::RawCitation;

const UNTITLED: &str = "Untitled";

/// Turn raw provider citations into attributed [`Citation`]s.
///
/// Each citation is attributed to the first candidate (terms, then handles,
/// then hashtags) found case-insensitively in either its title or the full
/// response `text`; failing that, the first candidate. Citations with a blank URL are dropped and repeated URLs keep
/// only their first occurrence.
#[must_use]
pub fn attribute_citations(
    queries: &QuerySet,
    text: &str,
    raw: Vec<RawCitation>,
) -> Vec<Citation> {
    let candidates: Vec<(String, &str)> = queries
        .attribution_candidates()
        .map(|c| (c.to_lowercase(), c))
        .collect();
    let text_lower = text.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();

    raw.into_iter()
        .filter_map(|citation| {
            let url = citation.url.trim().to_string();
            if url.is_empty() || !seen.insert(url.clone()) {
                return None;
            }

            let title = citation
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string());
            let source_term = best_match(&candidates, &title.to_lowercase(), &text_lower);

            Some(Citation {
                title,
                url,
                snippet: citation.snippet.filter(|s| !s.trim().is_empty()),
                published_at: None,
                source_term,
            })
        })
        .collect()
}

fn best_match(candidates: &[(String, &str)], title_lower: &str, text_lower: &str) -> String {
    candidates
        .iter()
        .find(|(needle, _)| {
            title_lower.contains(needle.as_str()) || text_lower.contains(needle.as_str())
        })
        .or_else(|| candidates.first())
        .map(|(_, original)| (*original).to_string())
        .unwrap_or_default()
}
