//! Email transports. [`ResendTransport`] posts to the Resend HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// A message addressed and ready to go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Dispatch one message and return the provider's message id.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if the provider cannot be reached or refuses the
    /// message.
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError>;
}

pub struct ResendTransport {
    client: Client,
    api_key: String,
    url: Url,
}

#[derive(Deserialize)]
struct SendReply {
    #[serde(default)]
    id: String,
}

impl ResendTransport {
    /// # Errors
    ///
    /// Returns [`MailError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`MailError::InvalidBaseUrl`] for a malformed base URL.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("digestd/0.1")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let url = Url::parse(&normalised)
            .and_then(|base| base.join("emails"))
            .map_err(|e| MailError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            url,
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // A 2xx with an unexpected body still means the message was accepted.
        let id = serde_json::from_str::<SendReply>(&body)
            .map(|r| r.id)
            .unwrap_or_default();
        Ok(id)
    }
}
