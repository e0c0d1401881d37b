//! Social search through xAI chat completions with live search enabled.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use digestd_core::{ApiEndpoint, DigestContext, Frequency, Provider, QuerySet};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

use crate::error::RetrievalError;
use crate::http::{build_client, endpoint_url, post_json};
use crate::prompt::social_search_prompt;
use crate::{ProviderResponse, RawCitation, Retriever};

pub struct SocialSearchClient {
    client: Client,
    api_key: String,
    model: String,
    url: Url,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl SocialSearchClient {
    /// # Errors
    ///
    /// Returns [`RetrievalError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`RetrievalError::InvalidBaseUrl`] for a malformed base URL.
    pub fn new(endpoint: &ApiEndpoint, timeout: Duration) -> Result<Self, RetrievalError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
            url: endpoint_url(&endpoint.base_url, "v1/chat/completions")?,
        })
    }
}

/// Live-search parameters. The search window starts one frequency interval
/// before `now`; X results are restricted to the configured handles when
/// there are any.
fn search_parameters(
    queries: &QuerySet,
    frequency: Frequency,
    now: DateTime<Utc>,
) -> serde_json::Value {
    let from_date = (now - frequency.interval()).format("%Y-%m-%d").to_string();

    let mut x_source = json!({ "type": "x" });
    if !queries.handles.is_empty() {
        let handles: Vec<&str> = queries
            .handles
            .iter()
            .map(|h| h.trim_start_matches('@'))
            .collect();
        x_source["included_x_handles"] = json!(handles);
    }

    json!({
        "mode": "on",
        "return_citations": true,
        "from_date": from_date,
        "sources": [{ "type": "web" }, { "type": "news" }, x_source],
    })
}

#[async_trait]
impl Retriever for SocialSearchClient {
    fn provider(&self) -> Provider {
        Provider::SocialSearch
    }

    async fn fetch(
        &self,
        queries: &QuerySet,
        context: &DigestContext,
    ) -> Result<ProviderResponse, RetrievalError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": social_search_prompt(queries, context) }],
            "search_parameters": search_parameters(queries, context.frequency, Utc::now()),
        });

        let reply: ChatReply = post_json(&self.client, &self.url, &self.api_key, &body).await?;

        let text = reply
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("\n");
        // Live search returns bare URLs; titles are filled in by attribution.
        let citations = reply
            .citations
            .into_iter()
            .map(|url| RawCitation {
                title: None,
                url,
                snippet: None,
            })
            .collect();

        Ok(ProviderResponse { text, citations })
    }
}
