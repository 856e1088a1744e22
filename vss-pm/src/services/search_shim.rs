//! Search shim client
//!
//! HTTP client for the external search/embedding microservice. The shim
//! accepts a batch of queries and answers with one result set per query id.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use vss_common::models::{ShimQuery, ShimSearchResponse};

const USER_AGENT: &str = concat!("vss-pm/", env!("CARGO_PKG_VERSION"));

/// Search shim client errors
#[derive(Debug, Error)]
pub enum ShimError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Search API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Dispatch seam for the search shim
///
/// The orchestrator only knows this trait; the HTTP client below is the
/// production implementation and tests substitute their own.
#[async_trait]
pub trait SearchShim: Send + Sync {
    /// Run a batch of queries against the shim
    async fn search(&self, batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError>;
}

/// Search shim client over HTTP
pub struct HttpSearchShim {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSearchShim {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ShimError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ShimError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchShim for HttpSearchShim {
    async fn search(&self, batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError> {
        let url = format!("{}/query", self.base_url);

        tracing::debug!(batch_size = batch.len(), url = %url, "Dispatching search batch to shim");

        let response = self
            .http_client
            .post(&url)
            .json(batch)
            .send()
            .await
            .map_err(|e| ShimError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ShimError::Api(status.as_u16(), error_text));
        }

        // The shim answers an empty body when it has nothing at all;
        // treat that the same as an empty result list.
        let body = response
            .text()
            .await
            .map_err(|e| ShimError::Network(e.to_string()))?;

        if body.trim().is_empty() {
            return Ok(ShimSearchResponse::default());
        }

        serde_json::from_str(&body).map_err(|e| ShimError::Parse(e.to_string()))
    }
}
