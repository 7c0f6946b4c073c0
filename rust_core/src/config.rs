//! Configuration for the club data layer
//!
//! This module manages all runtime configuration:
//! - Club identity (names, venue, league)
//! - Per-category cache TTLs
//! - The ordered provider list (API, scraped stats site, backend service)
//! - Candidate circuit breaker settings

use crate::circuit_breaker::{
    CandidateBreakerConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_SECS,
};
use crate::club::ClubIdentity;
use crate::error::ConfigError;
use crate::models::DataCategory;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Squads change rarely
pub const DEFAULT_SQUAD_TTL_SECS: u64 = 15 * 60;
pub const DEFAULT_STANDINGS_TTL_SECS: u64 = 10 * 60;
/// Fixtures change on match days
pub const DEFAULT_FIXTURES_TTL_SECS: u64 = 5 * 60;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_API_BASE_URL: &str = "https://api-football-v1.p.rapidapi.com/v3";
pub const DEFAULT_API_HOST: &str = "api-football-v1.p.rapidapi.com";
pub const DEFAULT_API_TEAM_ID: u64 = 4465;
/// Segunda División
pub const DEFAULT_API_LEAGUE_ID: u32 = 141;
pub const DEFAULT_API_SEASON: u16 = 2024;
pub const DEFAULT_API_TEAM_SEARCH: &str = "Racing Santander";

pub const DEFAULT_FBREF_URL: &str = "https://fbref.com/en/squads/dee3bbc8/Racing-Santander-Stats";
pub const DEFAULT_FBREF_CLUB_ID: &str = "dee3bbc8";
pub const DEFAULT_FBREF_LOGO_BASE: &str = "https://cdn.ssref.net/req/202507211/tlogo/fb";
/// Comma separated; a `raw:` prefix appends the target URL unencoded
pub const DEFAULT_SCRAPE_MIRRORS: &str = "https://api.allorigins.win/raw?url=,raw:https://cors-anywhere.herokuapp.com/,https://thingproxy.freeboard.io/fetch/";

pub const DEFAULT_PLAYER_PHOTO: &str = "/images/players/default.jpg";

/// Which extractor understands a candidate's documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    ApiFootball,
    Fbref,
    Backend,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::ApiFootball => "api-football",
            ProviderKind::Fbref => "fbref",
            ProviderKind::Backend => "backend",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" | "api-football" | "api_football" => Ok(ProviderKind::ApiFootball),
            "scrape" | "fbref" => Ok(ProviderKind::Fbref),
            "backend" => Ok(ProviderKind::Backend),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

// ============================================================================
// Cache TTLs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub squad: Duration,
    pub fixtures: Duration,
    pub standings: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            squad: Duration::from_secs(DEFAULT_SQUAD_TTL_SECS),
            fixtures: Duration::from_secs(DEFAULT_FIXTURES_TTL_SECS),
            standings: Duration::from_secs(DEFAULT_STANDINGS_TTL_SECS),
        }
    }
}

impl CacheTtls {
    pub fn for_category(&self, category: DataCategory) -> Duration {
        match category {
            DataCategory::Squad => self.squad,
            DataCategory::Fixtures => self.fixtures,
            DataCategory::Standings => self.standings,
        }
    }

    /// Volatile categories must not outlive stable ones
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.squad < self.standings || self.standings < self.fixtures {
            return Err(ConfigError::TtlOrder {
                squad: self.squad.as_secs(),
                standings: self.standings.as_secs(),
                fixtures: self.fixtures.as_secs(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Providers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiProviderConfig {
    pub base_url: String,
    pub host: String,
    pub api_key: String,
    /// Used when team discovery is disabled or fails
    pub team_id: u64,
    pub league_id: u32,
    pub season: u16,
    #[serde(default)]
    pub team_search: Option<String>,
    pub timeout_secs: u64,
}

impl ApiProviderConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            host: DEFAULT_API_HOST.to_string(),
            api_key: api_key.to_string(),
            team_id: DEFAULT_API_TEAM_ID,
            league_id: DEFAULT_API_LEAGUE_ID,
            season: DEFAULT_API_SEASON,
            team_search: Some(DEFAULT_API_TEAM_SEARCH.to_string()),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub id: String,
    pub prefix: String,
    /// Percent-encode the target URL before appending it to the prefix
    pub encode_target: bool,
}

impl MirrorConfig {
    /// Parse one `SCRAPE_MIRRORS` entry
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        let (prefix, encode_target) = match entry.strip_prefix("raw:") {
            Some(rest) => (rest.trim(), false),
            None => (entry, true),
        };
        let id = reqwest::Url::parse(prefix)
            .ok()
            .and_then(|url| url.host_str().map(|host| format!("mirror:{}", host)))
            .unwrap_or_else(|| format!("mirror:{}", prefix));

        Some(Self {
            id,
            prefix: prefix.to_string(),
            encode_target,
        })
    }

    pub fn relay_url(&self, target: &str) -> String {
        if self.encode_target {
            format!("{}{}", self.prefix, urlencoding::encode(target))
        } else {
            format!("{}{}", self.prefix, target)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeProviderConfig {
    pub target_url: String,
    /// Try the target without a relay first
    pub direct: bool,
    pub mirrors: Vec<MirrorConfig>,
    pub timeout_secs: u64,
    /// The club's squad id on the stats site, used for crest URLs
    pub club_stats_id: String,
    pub logo_base: String,
}

impl Default for ScrapeProviderConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_FBREF_URL.to_string(),
            direct: true,
            mirrors: parse_mirrors(DEFAULT_SCRAPE_MIRRORS),
            timeout_secs: DEFAULT_SCRAPE_TIMEOUT_SECS,
            club_stats_id: DEFAULT_FBREF_CLUB_ID.to_string(),
            logo_base: DEFAULT_FBREF_LOGO_BASE.to_string(),
        }
    }
}

impl ScrapeProviderConfig {
    pub fn logo_url(&self, stats_id: &str) -> String {
        format!("{}/{}.png", self.logo_base.trim_end_matches('/'), stats_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProviderConfig {
    /// e.g. `http://localhost:8000/api/v1/football`
    pub base_url: String,
    pub timeout_secs: u64,
    /// Push live data fetched from other providers to the backend
    pub write_through: bool,
}

/// One configured data source, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    Api(ApiProviderConfig),
    Scrape(ScrapeProviderConfig),
    Backend(BackendProviderConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Api(_) => ProviderKind::ApiFootball,
            ProviderConfig::Scrape(_) => ProviderKind::Fbref,
            ProviderConfig::Backend(_) => ProviderKind::Backend,
        }
    }

    /// Number of retrieval candidates this provider expands to
    pub fn candidate_count(&self) -> usize {
        match self {
            ProviderConfig::Scrape(scrape) => scrape.mirrors.len() + usize::from(scrape.direct),
            _ => 1,
        }
    }
}

// ============================================================================
// Top level
// ============================================================================

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub club: ClubIdentity,
    pub ttls: CacheTtls,
    /// Tried in order
    pub providers: Vec<ProviderConfig>,
    pub default_photo: String,
    pub breaker: CandidateBreakerConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            club: ClubIdentity::default(),
            ttls: CacheTtls::default(),
            providers: vec![ProviderConfig::Scrape(ScrapeProviderConfig::default())],
            default_photo: DEFAULT_PLAYER_PHOTO.to_string(),
            breaker: CandidateBreakerConfig::default(),
        }
    }
}

impl DataConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let mut club = ClubIdentity::default();
        if let Ok(name) = env::var("CLUB_NAME") {
            club.name = name;
        }
        if let Ok(aliases) = env::var("CLUB_ALIASES") {
            club.aliases = split_list(&aliases);
        }
        if let Ok(venue) = env::var("CLUB_HOME_VENUE") {
            club.home_venue = venue;
        }
        if let Ok(logo) = env::var("CLUB_LOGO") {
            club.logo = logo;
        }
        if let Ok(league) = env::var("CLUB_LEAGUE_NAME") {
            club.league = league;
        }

        let ttls = CacheTtls {
            squad: Duration::from_secs(env_or("SQUAD_TTL_SECS", DEFAULT_SQUAD_TTL_SECS)),
            fixtures: Duration::from_secs(env_or("FIXTURES_TTL_SECS", DEFAULT_FIXTURES_TTL_SECS)),
            standings: Duration::from_secs(env_or(
                "STANDINGS_TTL_SECS",
                DEFAULT_STANDINGS_TTL_SECS,
            )),
        };

        let breaker = CandidateBreakerConfig {
            failure_threshold: env_or("CANDIDATE_FAILURE_THRESHOLD", DEFAULT_FAILURE_THRESHOLD),
            recovery_timeout: Duration::from_secs(env_or(
                "CANDIDATE_RECOVERY_SECS",
                DEFAULT_RECOVERY_SECS,
            )),
            success_threshold: 1,
        };

        let order = env::var("PROVIDER_ORDER")
            .ok()
            .map(|v| {
                split_list(&v)
                    .iter()
                    .filter_map(|p| p.parse::<ProviderKind>().ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| {
                vec![
                    ProviderKind::Backend,
                    ProviderKind::ApiFootball,
                    ProviderKind::Fbref,
                ]
            });

        let providers = order
            .into_iter()
            .filter_map(|kind| match kind {
                ProviderKind::ApiFootball => load_api_provider().map(ProviderConfig::Api),
                ProviderKind::Fbref => load_scrape_provider().map(ProviderConfig::Scrape),
                ProviderKind::Backend => load_backend_provider().map(ProviderConfig::Backend),
            })
            .collect();

        Self {
            club,
            ttls,
            providers,
            default_photo: env::var("DEFAULT_PLAYER_PHOTO")
                .unwrap_or_else(|_| DEFAULT_PLAYER_PHOTO.to_string()),
            breaker,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ttls.validate()?;
        if self.candidate_count() == 0 {
            return Err(ConfigError::NoCandidates);
        }
        for provider in &self.providers {
            let timeout_secs = match provider {
                ProviderConfig::Api(api) => api.timeout_secs,
                ProviderConfig::Scrape(scrape) => scrape.timeout_secs,
                ProviderConfig::Backend(backend) => backend.timeout_secs,
            };
            if timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("{} timeout", provider.kind()),
                    value: "0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn candidate_count(&self) -> usize {
        self.providers.iter().map(ProviderConfig::candidate_count).sum()
    }

    pub fn backend(&self) -> Option<&BackendProviderConfig> {
        self.providers.iter().find_map(|p| match p {
            ProviderConfig::Backend(backend) => Some(backend),
            _ => None,
        })
    }
}

/// API-Football is only enabled with a key
fn load_api_provider() -> Option<ApiProviderConfig> {
    let key = env::var("API_FOOTBALL_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let mut api = ApiProviderConfig::new(key.trim());

    if let Ok(base_url) = env::var("API_FOOTBALL_BASE_URL") {
        api.base_url = base_url;
    }
    if let Ok(host) = env::var("API_FOOTBALL_HOST") {
        api.host = host;
    }
    api.team_id = env_or("API_FOOTBALL_TEAM_ID", DEFAULT_API_TEAM_ID);
    api.league_id = env_or("API_FOOTBALL_LEAGUE_ID", DEFAULT_API_LEAGUE_ID);
    api.season = env_or("API_FOOTBALL_SEASON", DEFAULT_API_SEASON);
    if let Ok(search) = env::var("API_FOOTBALL_TEAM_SEARCH") {
        // Empty disables discovery
        api.team_search = Some(search).filter(|s| !s.trim().is_empty());
    }
    Some(api)
}

fn load_scrape_provider() -> Option<ScrapeProviderConfig> {
    if !env_or("SCRAPE_ENABLED", true) {
        return None;
    }

    let mut scrape = ScrapeProviderConfig::default();
    if let Ok(url) = env::var("FBREF_URL") {
        scrape.target_url = url;
    }
    if let Ok(id) = env::var("FBREF_CLUB_ID") {
        scrape.club_stats_id = id;
    }
    if let Ok(mirrors) = env::var("SCRAPE_MIRRORS") {
        scrape.mirrors = parse_mirrors(&mirrors);
    }
    scrape.direct = env_or("SCRAPE_DIRECT", true);
    scrape.timeout_secs = env_or("SCRAPE_TIMEOUT_SECS", DEFAULT_SCRAPE_TIMEOUT_SECS);
    Some(scrape)
}

fn load_backend_provider() -> Option<BackendProviderConfig> {
    let base_url = env::var("BACKEND_URL").ok().filter(|u| !u.trim().is_empty())?;
    Some(BackendProviderConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        timeout_secs: env_or("BACKEND_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
        write_through: env_or("BACKEND_WRITE_THROUGH", false),
    })
}

pub fn parse_mirrors(value: &str) -> Vec<MirrorConfig> {
    value.split(',').filter_map(MirrorConfig::parse).collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse an env var, falling back to `default` when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
