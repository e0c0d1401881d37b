//! Parsing and validating the model's JSON reply.

use std::sync::LazyLock;

use digestd_core::{DigestSummary, SummaryItem, SummarySection};
use regex::Regex;
use serde::Deserialize;

use crate::error::SummarizeError;

static FENCED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct RawSummary {
    title: Option<String>,
    date: Option<String>,
    sections: Option<Vec<RawSection>>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    title: String,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source_term: String,
}

/// Locate the JSON object in a completion that may wrap it in a Markdown
/// fence or surround it with prose. With several fenced blocks the first one
/// wins.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    if let Some(inner) = FENCED_JSON_RE.captures(text).and_then(|c| c.get(1)) {
        return Some(inner.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse and validate a completion.
///
/// Requires a non-empty `title`, a non-empty `date`, and a `sections` array
/// (which may be empty).
pub(crate) fn parse_summary(text: &str) -> Result<DigestSummary, SummarizeError> {
    let json = extract_json(text)
        .ok_or_else(|| SummarizeError::Malformed("no JSON object in completion".to_string()))?;

    let raw: RawSummary =
        serde_json::from_str(json).map_err(|e| SummarizeError::Malformed(e.to_string()))?;

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SummarizeError::Invalid("missing title".to_string()))?;
    let date = raw
        .date
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| SummarizeError::Invalid("missing date".to_string()))?;
    let sections = raw
        .sections
        .ok_or_else(|| SummarizeError::Invalid("missing sections".to_string()))?;

    Ok(DigestSummary {
        title,
        date,
        sections: sections
            .into_iter()
            .map(|section| SummarySection {
                title: section.title.trim().to_string(),
                items: section
                    .items
                    .into_iter()
                    .map(|item| SummaryItem {
                        title: item.title.trim().to_string(),
                        summary: item.summary.trim().to_string(),
                        url: item.url.trim().to_string(),
                        source_term: item.source_term.trim().to_string(),
                    })
                    .collect(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "title": "AI News",
        "date": "3/1/2025",
        "sections": [{
            "title": "artificial intelligence",
            "items": [{
                "title": "AI breakthrough",
                "summary": "A lab reported a new result.",
                "url": "https://news.example/ai",
                "source_term": "artificial intelligence"
            }]
        }]
    }"#;

    #[test]
    fn parses_bare_json() {
        let summary = parse_summary(VALID).unwrap();
        assert_eq!(summary.title, "AI News");
        assert_eq!(summary.sections.len(), 1);
        assert_eq!(summary.sections[0].items[0].url, "https://news.example/ai");
    }

    #[test]
    fn parses_fenced_json_with_surrounding_prose() {
        let text = format!("Here is your digest:\n```json\n{VALID}\n```\nEnjoy!");
        let summary = parse_summary(&text).unwrap();
        assert_eq!(summary.date, "3/1/2025");
    }

    #[test]
    fn first_fenced_block_wins_over_later_examples() {
        let text = format!(
            "```json\n{VALID}\n```\nA section looks like this:\n```json\n{{\"title\": \"example\", \"items\": []}}\n```"
        );
        let summary = parse_summary(&text).unwrap();
        assert_eq!(summary.title, "AI News");
        assert_eq!(summary.sections[0].items.len(), 1);
    }

    #[test]
    fn parses_json_embedded_in_prose_without_fence() {
        let text = format!("Sure. {VALID} Let me know if you need more.");
        assert!(parse_summary(&text).is_ok());
    }

    #[test]
    fn empty_sections_array_is_valid() {
        let summary =
            parse_summary(r#"{"title": "Daily Digest", "date": "today", "sections": []}"#).unwrap();
        assert!(summary.sections.is_empty());
    }

    #[test]
    fn missing_title_is_invalid() {
        let err = parse_summary(r#"{"date": "today", "sections": []}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::Invalid(ref m) if m == "missing title"));
    }

    #[test]
    fn blank_date_is_invalid() {
        let err = parse_summary(r#"{"title": "T", "date": "  ", "sections": []}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::Invalid(ref m) if m == "missing date"));
    }

    #[test]
    fn missing_sections_is_invalid() {
        let err = parse_summary(r#"{"title": "T", "date": "today"}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::Invalid(ref m) if m == "missing sections"));
    }

    #[test]
    fn sections_of_wrong_type_are_malformed() {
        let err =
            parse_summary(r#"{"title": "T", "date": "today", "sections": "none"}"#).unwrap_err();
        assert!(matches!(err, SummarizeError::Malformed(_)));
    }

    #[test]
    fn prose_without_json_is_malformed() {
        let err = parse_summary("I could not find any news today.").unwrap_err();
        assert!(matches!(err, SummarizeError::Malformed(_)));
    }
}
