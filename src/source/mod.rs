pub mod github;
pub mod linear;
pub mod types;

pub use types::{ActivityRecord, AggregatedActivity, CandidateItem, ItemDetail, TimeWindow};
#[cfg(test)]
pub use types::{Comment, Label, WorkflowState};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} is not configured")]
    Configuration(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{source_name} does not support {capability}")]
    Unsupported {
        source_name: String,
        capability: &'static str,
    },
}

/// What a source can do. The orchestrator dispatches on these flags,
/// never on the concrete source type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Can list candidate items for review
    pub candidates: bool,
    /// Can fetch full detail for one listed candidate
    pub detail: bool,
    /// Can report an aggregated activity snapshot
    pub aggregate: bool,
}

/// An external service that can report items changed or created in a window.
/// Operations a source does not advertise in `capabilities()` fall back to
/// `SourceError::Unsupported`.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Human-readable name (e.g., "Linear")
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Fail with `SourceError::Configuration` when the source could not
    /// make a request at all. Makes no network calls.
    fn check_config(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn list_candidates(&self, _window: &TimeWindow) -> Result<Vec<CandidateItem>, SourceError> {
        Err(self.unsupported("candidate listing"))
    }

    async fn fetch_detail(&self, _id: &str) -> Result<ItemDetail, SourceError> {
        Err(self.unsupported("item detail"))
    }

    async fn fetch_aggregate(&self, _window: &TimeWindow) -> Result<AggregatedActivity, SourceError> {
        Err(self.unsupported("aggregate activity"))
    }

    fn unsupported(&self, capability: &'static str) -> SourceError {
        SourceError::Unsupported {
            source_name: self.name().to_string(),
            capability,
        }
    }
}

/// A source as plugged into a run. A failing `required` source aborts the
/// run; an optional one degrades to empty data with a warning.
pub struct SourceRegistration {
    pub source: Box<dyn ActivitySource>,
    pub required: bool,
}

impl SourceRegistration {
    pub fn required(source: impl ActivitySource + 'static) -> Self {
        Self {
            source: Box::new(source),
            required: true,
        }
    }

    pub fn optional(source: impl ActivitySource + 'static) -> Self {
        Self {
            source: Box::new(source),
            required: false,
        }
    }
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

/// POST a GraphQL payload and return the raw body.
/// Non-success HTTP statuses surface as `SourceError::Transport`.
pub(crate) async fn post_graphql(
    client: &reqwest::Client,
    url: &str,
    authorization: &str,
    payload: &serde_json::Value,
) -> Result<String, SourceError> {
    let body = client
        .post(url)
        .header("User-Agent", "daily-summary")
        .header("Authorization", authorization)
        .json(payload)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!(url = %url, response_bytes = body.len(), "received GraphQL response");
    Ok(body)
}

/// Decode a GraphQL response body into its `data` object.
/// A non-empty `errors` envelope is treated as a decode failure rather
/// than silently yielding empty data.
pub(crate) fn decode_graphql<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    let response: GraphqlResponse<T> =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    if let Some(first) = response.errors.as_ref().and_then(|errors| errors.first()) {
        return Err(SourceError::Decode(format!("graphql error: {}", first.message)));
    }

    response
        .data
        .ok_or_else(|| SourceError::Decode("response has no data".to_string()))
}
