use super::{http_client, parse_json, read_body};
use crate::config::{ApiProviderConfig, ProviderKind};
use crate::error::RetrievalError;
use crate::models::DataCategory;
use crate::retrieval::{DocumentBody, DocumentSource, RawDocument};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

const SOURCE_ID: &str = "api-football";

/// Resolved provider identity for the club.
///
/// Produced once per client and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderHandle {
    pub team_id: u64,
    /// False when the configured id was used
    pub discovered: bool,
}

/// API-Football (RapidAPI) client
pub struct ApiFootballClient {
    client: Client,
    config: ApiProviderConfig,
    handle: OnceCell<ProviderHandle>,
}

impl std::fmt::Debug for ApiFootballClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiFootballClient")
            .field("base_url", &self.config.base_url)
            .field("handle", &self.handle.get())
            .finish()
    }
}

impl ApiFootballClient {
    pub fn new(config: ApiProviderConfig) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            config,
            handle: OnceCell::new(),
        }
    }

    /// Team handle, resolving it on first use
    pub async fn handle(&self) -> ProviderHandle {
        *self.handle.get_or_init(|| self.discover_team()).await
    }

    /// Look the club up by name; any failure keeps the configured id
    async fn discover_team(&self) -> ProviderHandle {
        let configured = ProviderHandle {
            team_id: self.config.team_id,
            discovered: false,
        };

        let Some(search) = self.config.team_search.as_deref() else {
            return configured;
        };

        let path = format!("teams?search={}", urlencoding::encode(search));
        match self.get_json(&path).await {
            Ok(json) => match team_id_from_search(&json) {
                Some(team_id) => {
                    info!("Resolved API-Football team '{}' to id {}", search, team_id);
                    ProviderHandle {
                        team_id,
                        discovered: true,
                    }
                }
                None => {
                    warn!(
                        "No API-Football team matched '{}', using configured id {}",
                        search, self.config.team_id
                    );
                    configured
                }
            },
            Err(e) => {
                warn!(
                    "API-Football team discovery failed ({}), using configured id {}",
                    e, self.config.team_id
                );
                configured
            }
        }
    }

    fn endpoint(&self, category: DataCategory, team_id: u64) -> String {
        match category {
            DataCategory::Squad => {
                format!("players?team={}&season={}", team_id, self.config.season)
            }
            DataCategory::Fixtures => {
                format!("fixtures?team={}&season={}", team_id, self.config.season)
            }
            DataCategory::Standings => format!(
                "standings?league={}&season={}",
                self.config.league_id, self.config.season
            ),
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, RetrievalError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.host)
            .send()
            .await
            .map_err(|e| RetrievalError::transport(SOURCE_ID, e))?;

        let body = read_body(SOURCE_ID, response).await?;
        let json = parse_json(SOURCE_ID, &body)?;

        // The API reports quota and auth problems with HTTP 200
        if let Some(errors) = json.get("errors") {
            let has_errors = match errors {
                serde_json::Value::Array(list) => !list.is_empty(),
                serde_json::Value::Object(map) => !map.is_empty(),
                _ => false,
            };
            if has_errors {
                return Err(RetrievalError::UnexpectedBody {
                    source_id: SOURCE_ID.to_string(),
                    reason: format!("API errors: {}", errors),
                });
            }
        }

        Ok(json)
    }
}

fn team_id_from_search(json: &serde_json::Value) -> Option<u64> {
    json["response"]
        .as_array()?
        .iter()
        .find_map(|entry| entry["team"]["id"].as_u64())
}

#[async_trait]
impl DocumentSource for ApiFootballClient {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::ApiFootball
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    async fn fetch(&self, category: DataCategory) -> Result<RawDocument, RetrievalError> {
        let handle = self.handle().await;
        let json = self.get_json(&self.endpoint(category, handle.team_id)).await?;

        Ok(RawDocument {
            provider: ProviderKind::ApiFootball,
            source_id: SOURCE_ID.to_string(),
            team_id: Some(handle.team_id),
            body: DocumentBody::Json(json),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoints() {
        let client = ApiFootballClient::new(ApiProviderConfig::new("key"));
        assert_eq!(
            client.endpoint(DataCategory::Squad, 4465),
            "players?team=4465&season=2024"
        );
        assert_eq!(
            client.endpoint(DataCategory::Fixtures, 4465),
            "fixtures?team=4465&season=2024"
        );
        assert_eq!(
            client.endpoint(DataCategory::Standings, 4465),
            "standings?league=141&season=2024"
        );
    }

    #[test]
    fn test_team_id_from_search() {
        let body = json!({
            "response": [
                { "team": { "id": 4465, "name": "Racing Santander" } }
            ]
        });
        assert_eq!(team_id_from_search(&body), Some(4465));
        assert_eq!(team_id_from_search(&json!({ "response": [] })), None);
        assert_eq!(team_id_from_search(&json!({})), None);
    }

    #[tokio::test]
    async fn test_handle_uses_configured_id_without_search() {
        let mut config = ApiProviderConfig::new("key");
        config.team_search = None;
        config.team_id = 77;
        let client = ApiFootballClient::new(config);

        let handle = client.handle().await;
        assert_eq!(handle.team_id, 77);
        assert!(!handle.discovered);
        // Memoized
        assert_eq!(client.handle().await, handle);
    }

    #[tokio::test]
    async fn test_failed_discovery_falls_back_to_configured_id() {
        let mut config = ApiProviderConfig::new("key");
        // Nothing listens here
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 1;
        let client = ApiFootballClient::new(config);

        let handle = client.handle().await;
        assert_eq!(handle.team_id, 4465);
        assert!(!handle.discovered);
    }
}
