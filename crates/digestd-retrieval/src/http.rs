use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::RetrievalError;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, RetrievalError> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent("digestd/0.1")
        .build()?)
}

/// Resolve `path` against `base_url`, which may or may not end in a slash.
pub(crate) fn endpoint_url(base_url: &str, path: &str) -> Result<Url, RetrievalError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised)
        .and_then(|base| base.join(path))
        .map_err(|e| RetrievalError::InvalidBaseUrl(format!("{base_url}: {e}")))
}

/// POST a JSON body with bearer auth and decode the JSON reply.
pub(crate) async fn post_json<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
    api_key: &str,
    body: &serde_json::Value,
) -> Result<T, RetrievalError> {
    let response = client
        .post(url.clone())
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(RetrievalError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| RetrievalError::Deserialize {
        context: url.to_string(),
        source: e,
    })
}
