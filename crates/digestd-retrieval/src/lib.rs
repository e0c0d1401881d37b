//! Content retrievers and their fault-tolerant fan-out.
//!
//! A [`Retriever`] talks to one upstream provider and may fail. Callers never
//! see those failures: [`retrieve`] applies the per-call deadline, attributes
//! citations to query terms, and degrades any error to an empty result.
//! [`retrieve_all`] runs every configured provider concurrently and waits for
//! all of them to settle.

mod attribution;
mod error;
mod http;
mod prompt;
mod social_search;
mod web_search;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use digestd_core::{ClassifiedSources, DigestContext, Provider, QuerySet, RetrievedContent};
use futures::future::join_all;

pub use attribution::attribute_citations;
pub use error::RetrievalError;
pub use prompt::{social_search_prompt, web_search_prompt};
pub use social_search::SocialSearchClient;
pub use web_search::WebSearchClient;

/// A citation as the provider reported it, before attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCitation {
    pub title: Option<String>,
    pub url: String,
    pub snippet: Option<String>,
}

/// Unprocessed provider output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    pub text: String,
    pub citations: Vec<RawCitation>,
}

/// One upstream content provider.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Which slice of the classified sources this provider consumes.
    fn provider(&self) -> Provider;

    /// Run the provider's search for a non-empty query set.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] on transport, status, or decoding failure.
    async fn fetch(
        &self,
        queries: &QuerySet,
        context: &DigestContext,
    ) -> Result<ProviderResponse, RetrievalError>;
}

/// Retrieve content from one provider. Never fails.
///
/// An empty query set short-circuits without calling the provider. A provider
/// error or a call exceeding `deadline` is logged at `warn` and yields
/// [`RetrievedContent::empty`].
pub async fn retrieve(
    retriever: &dyn Retriever,
    queries: &QuerySet,
    context: &DigestContext,
    deadline: Duration,
) -> RetrievedContent {
    let provider = retriever.provider().as_str();

    if queries.is_empty() {
        tracing::debug!(provider, "no queries for provider, skipping");
        return RetrievedContent::empty();
    }

    let outcome = match tokio::time::timeout(deadline, retriever.fetch(queries, context)).await {
        Ok(result) => result,
        Err(_) => Err(RetrievalError::Timeout(deadline)),
    };

    match outcome {
        Ok(response) => {
            let citations = attribute_citations(queries, &response.text, response.citations);
            tracing::debug!(
                provider,
                citations = citations.len(),
                chars = response.text.len(),
                "retrieved provider content"
            );
            RetrievedContent {
                content: response.text,
                citations,
            }
        }
        Err(e) => {
            tracing::warn!(provider, error = %e, "provider retrieval failed");
            RetrievedContent::empty()
        }
    }
}

/// Fan out to every retriever concurrently and wait for all of them.
///
/// Results are returned in `retrievers` order. A slow or failing provider
/// never cancels the others.
pub async fn retrieve_all(
    retrievers: &[Arc<dyn Retriever>],
    classified: &ClassifiedSources,
    context: &DigestContext,
    deadline: Duration,
) -> Vec<RetrievedContent> {
    join_all(retrievers.iter().map(|retriever| {
        let queries = classified.for_provider(retriever.provider());
        retrieve(retriever.as_ref(), queries, context, deadline)
    }))
    .await
}
