use super::{http_client, read_body, BROWSER_USER_AGENT};
use crate::config::{MirrorConfig, ProviderKind, ScrapeProviderConfig};
use crate::error::RetrievalError;
use crate::models::DataCategory;
use crate::retrieval::{DocumentBody, DocumentSource, RawDocument};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches the club's stats page, either directly or through a relay mirror.
///
/// One page carries the squad table, the match log and the standings
/// summary, so every category requests the same URL.
pub struct ScrapeClient {
    client: Client,
    source_id: String,
    url: String,
    timeout: Duration,
}

impl std::fmt::Debug for ScrapeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeClient")
            .field("source_id", &self.source_id)
            .field("url", &self.url)
            .finish()
    }
}

impl ScrapeClient {
    pub fn direct(config: &ScrapeProviderConfig) -> Self {
        Self::build(ProviderKind::Fbref.as_str(), config.target_url.clone(), config)
    }

    pub fn via_mirror(config: &ScrapeProviderConfig, mirror: &MirrorConfig) -> Self {
        Self::build(&mirror.id, mirror.relay_url(&config.target_url), config)
    }

    fn build(source_id: &str, url: String, config: &ScrapeProviderConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self {
            client: http_client(timeout),
            source_id: source_id.to_string(),
            url,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Relays answer errors with 200 and a short text or JSON body
fn looks_like_page(body: &str) -> bool {
    let head: String = body.chars().take(4096).collect::<String>().to_lowercase();
    head.contains("<html") || head.contains("<!doctype") || body.contains("<table")
}

#[async_trait]
impl DocumentSource for ScrapeClient {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Fbref
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, category: DataCategory) -> Result<RawDocument, RetrievalError> {
        debug!("Fetching {} page for {} via {}", self.url, category, self.source_id);

        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| RetrievalError::transport(&self.source_id, e))?;

        let body = read_body(&self.source_id, response).await?;
        if !looks_like_page(&body) {
            return Err(RetrievalError::UnexpectedBody {
                source_id: self.source_id.clone(),
                reason: "response is not an HTML page".to_string(),
            });
        }

        Ok(RawDocument {
            provider: ProviderKind::Fbref,
            source_id: self.source_id.clone(),
            team_id: None,
            body: DocumentBody::Html(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_and_mirror_urls() {
        let config = ScrapeProviderConfig::default();
        let direct = ScrapeClient::direct(&config);
        assert_eq!(direct.source_id(), "fbref");
        assert_eq!(direct.url(), config.target_url);
        assert_eq!(direct.timeout(), Duration::from_secs(60));

        let mirror = ScrapeClient::via_mirror(&config, &config.mirrors[2]);
        assert_eq!(mirror.source_id(), "mirror:thingproxy.freeboard.io");
        assert!(mirror
            .url()
            .starts_with("https://thingproxy.freeboard.io/fetch/https%3A%2F%2Ffbref.com"));
    }

    #[test]
    fn test_looks_like_page() {
        assert!(looks_like_page("<!DOCTYPE html><html><body></body></html>"));
        assert!(looks_like_page("<div><table id=\"x\"></table></div>"));
        assert!(!looks_like_page("{\"error\":\"rate limited\"}"));
        assert!(!looks_like_page("Missing required request header."));
    }
}
