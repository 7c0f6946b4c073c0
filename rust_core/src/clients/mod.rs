pub mod api_football;
pub mod backend;
pub mod scrape;

// Re-export commonly used types
pub use api_football::{ApiFootballClient, ProviderHandle};
pub use backend::BackendClient;
pub use scrape::ScrapeClient;

use crate::config::{DataConfig, ProviderConfig};
use crate::error::RetrievalError;
use crate::models::CategoryData;
use crate::retrieval::DocumentSource;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Receives live data after it was accepted into the cache
#[async_trait]
pub trait DataSink: Send + Sync {
    fn sink_name(&self) -> &str;

    async fn push(&self, data: &CategoryData) -> Result<()>;
}

/// Expand the configured providers into retrieval candidates, in order.
pub fn build_sources(config: &DataConfig) -> Vec<Arc<dyn DocumentSource>> {
    let mut sources: Vec<Arc<dyn DocumentSource>> = Vec::new();

    for provider in &config.providers {
        match provider {
            ProviderConfig::Api(api) => {
                sources.push(Arc::new(ApiFootballClient::new(api.clone())));
            }
            ProviderConfig::Scrape(scrape) => {
                if scrape.direct {
                    sources.push(Arc::new(ScrapeClient::direct(scrape)));
                }
                for mirror in &scrape.mirrors {
                    sources.push(Arc::new(ScrapeClient::via_mirror(scrape, mirror)));
                }
            }
            ProviderConfig::Backend(backend) => {
                sources.push(Arc::new(BackendClient::new(backend.clone())));
            }
        }
    }

    sources
}

/// Backend write-through sink, when configured
pub fn build_sink(config: &DataConfig) -> Option<Arc<dyn DataSink>> {
    config
        .backend()
        .filter(|backend| backend.write_through)
        .map(|backend| Arc::new(BackendClient::new(backend.clone())) as Arc<dyn DataSink>)
}

pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Read a response body, mapping non-2xx and empty bodies to retrieval errors
pub(crate) async fn read_body(
    source_id: &str,
    response: reqwest::Response,
) -> Result<String, RetrievalError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RetrievalError::Status {
            source_id: source_id.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| RetrievalError::transport(source_id, e))?;

    if body.trim().is_empty() {
        return Err(RetrievalError::EmptyBody {
            source_id: source_id.to_string(),
        });
    }
    Ok(body)
}

pub(crate) fn parse_json(source_id: &str, body: &str) -> Result<serde_json::Value, RetrievalError> {
    serde_json::from_str(body).map_err(|e| RetrievalError::UnexpectedBody {
        source_id: source_id.to_string(),
        reason: format!("invalid JSON: {}", e),
    })
}
