//! Language-model seam and the Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use digestd_core::ApiEndpoint;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::SummarizeError;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.7;

/// A text-completion model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` and return the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`SummarizeError`] on transport, status, or decoding failure.
    async fn complete(&self, prompt: &str) -> Result<String, SummarizeError>;
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    url: Url,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`SummarizeError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`SummarizeError::InvalidBaseUrl`] for a malformed base URL.
    pub fn new(endpoint: &ApiEndpoint, timeout: Duration) -> Result<Self, SummarizeError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("digestd/0.1")
            .build()?;

        let normalised = format!("{}/", endpoint.base_url.trim_end_matches('/'));
        let url = Url::parse(&normalised)
            .and_then(|base| base.join("v1/messages"))
            .map_err(|e| SummarizeError::InvalidBaseUrl(format!("{}: {e}", endpoint.base_url)))?;

        Ok(Self {
            client,
            api_key: endpoint.api_key.clone(),
            model: endpoint.model.clone(),
            url,
        })
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, SummarizeError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.url.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: MessagesReply =
            serde_json::from_str(&body).map_err(|e| SummarizeError::Deserialize {
                context: self.url.to_string(),
                source: e,
            })?;

        let text: String = reply
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyCompletion);
        }
        Ok(text)
    }
}
