use super::{http_client, parse_json, read_body, DataSink};
use crate::config::{BackendProviderConfig, ProviderKind};
use crate::error::RetrievalError;
use crate::models::{CategoryData, DataCategory};
use crate::retrieval::{DocumentBody, DocumentSource, RawDocument};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SOURCE_ID: &str = "backend";

/// Client for the backend persistence service (`/api/v1/football`).
///
/// Serves as a retrieval candidate and, with write-through enabled, as the
/// sink for live data fetched from the other providers.
pub struct BackendClient {
    client: Client,
    config: BackendProviderConfig,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl BackendClient {
    pub fn new(config: BackendProviderConfig) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Backend cache status report
    pub async fn status(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await
            .context("backend status request failed")?;
        let body = read_body(SOURCE_ID, response).await?;
        Ok(parse_json(SOURCE_ID, &body)?)
    }

    /// Ask the backend to rescrape everything it stores
    pub async fn request_refresh(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.url("refresh"))
            .send()
            .await
            .context("backend refresh request failed")?;
        let body = read_body(SOURCE_ID, response).await?;
        Ok(parse_json(SOURCE_ID, &body)?)
    }
}

fn read_path(category: DataCategory) -> &'static str {
    match category {
        DataCategory::Squad => "players",
        DataCategory::Fixtures => "fixtures",
        DataCategory::Standings => "standings",
    }
}

/// Load endpoint and body for a write-through push
pub(crate) fn load_request(data: &CategoryData) -> (&'static str, serde_json::Value) {
    match data {
        CategoryData::Squad(players) => ("load-players", json!({ "squad": players })),
        CategoryData::Fixtures(set) => (
            "load-fixtures",
            json!({
                "pastFixtures": set.past,
                "upcomingFixtures": set.upcoming,
            }),
        ),
        CategoryData::Standings(position) => {
            ("load-standings", json!({ "leaguePosition": position }))
        }
    }
}

#[async_trait]
impl DocumentSource for BackendClient {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Backend
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn fetch(&self, category: DataCategory) -> Result<RawDocument, RetrievalError> {
        let response = self
            .client
            .get(self.url(read_path(category)))
            .send()
            .await
            .map_err(|e| RetrievalError::transport(SOURCE_ID, e))?;

        let body = read_body(SOURCE_ID, response).await?;
        let json = parse_json(SOURCE_ID, &body)?;

        if json["success"].as_bool() == Some(false) {
            return Err(RetrievalError::UnexpectedBody {
                source_id: SOURCE_ID.to_string(),
                reason: json["message"]
                    .as_str()
                    .unwrap_or("backend reported failure")
                    .to_string(),
            });
        }

        Ok(RawDocument {
            provider: ProviderKind::Backend,
            source_id: SOURCE_ID.to_string(),
            team_id: None,
            body: DocumentBody::Json(json),
        })
    }
}

#[async_trait]
impl DataSink for BackendClient {
    fn sink_name(&self) -> &str {
        SOURCE_ID
    }

    async fn push(&self, data: &CategoryData) -> Result<()> {
        let (path, payload) = load_request(data);
        let response = self
            .client
            .post(self.url(path))
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("backend {} request failed", path))?;

        if !response.status().is_success() {
            return Err(anyhow!("backend {} returned HTTP {}", path, response.status()));
        }
        debug!("Pushed {} {} records to backend", data.record_count(), data.category());
        Ok(())
    }
}
