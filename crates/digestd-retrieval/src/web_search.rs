//! Web search through the OpenAI Responses API with the hosted
//! `web_search_preview` tool.

use std::time::Duration;

use async_trait::async_trait;
use digestd_core::{ApiEndpoint, DigestContext, Provider, QuerySet};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;

use crate::error::RetrievalError;
use crate::http::{build_client, endpoint_url, post_json};
use crate::prompt::web_search_prompt;
use crate::{ProviderResponse, RawCitation, Retriever};

pub struct WebSearchClient {
    client: Client,
    api_key: String,
    model: String,
    url: Url,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    #[serde(rename = "type")]
    kind: String,
    url: Option<String>,
    title: Option<String>,
}

impl WebSearchClient {
    /// # Errors
    ///
    /// Returns [`RetrievalError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`RetrievalError::InvalidBaseUrl`] for a malformed base URL.
    pub fn new(endpoint: &ApiEndpoint, timeout: Duration) -> Result<Self, RetrievalError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
            url: endpoint_url(&endpoint.base_url, "v1/responses")?,
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "input": prompt,
            "tools": [{ "type": "web_search_preview", "search_context_size": "high" }],
            "tool_choice": { "type": "web_search_preview" },
        })
    }
}

#[async_trait]
impl Retriever for WebSearchClient {
    fn provider(&self) -> Provider {
        Provider::WebSearch
    }

    async fn fetch(
        &self,
        queries: &QuerySet,
        context: &DigestContext,
    ) -> Result<ProviderResponse, RetrievalError> {
        let prompt = web_search_prompt(queries, context);
        let reply: ResponsesReply =
            post_json(&self.client, &self.url, &self.api_key, &self.request_body(&prompt)).await?;
        Ok(flatten_reply(reply))
    }
}

/// Concatenate every `output_text` part and collect its `url_citation`s.
fn flatten_reply(reply: ResponsesReply) -> ProviderResponse {
    let mut out = ProviderResponse::default();

    let parts = reply
        .output
        .into_iter()
        .filter(|item| item.kind == "message")
        .flat_map(|item| item.content)
        .filter(|part| part.kind == "output_text");

    for part in parts {
        if !out.text.is_empty() {
            out.text.push('\n');
        }
        out.text.push_str(&part.text);

        out.citations.extend(
            part.annotations
                .into_iter()
                .filter(|a| a.kind == "url_citation")
                .filter_map(|a| {
                    a.url.map(|url| RawCitation {
                        title: a.title,
                        url,
                        snippet: None,
                    })
                }),
        );
    }

    out
}
