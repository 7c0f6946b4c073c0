//! Club data facade
//!
//! Single entry point for consumers. Every read goes cache → retrieval →
//! extraction → acceptance, and any failure along the way turns into the
//! static fallback for that category. Callers always get data back.
//!
//! Categories load independently. Concurrent callers asking for the same
//! category share one in-flight fetch.

use crate::cache::{CacheEntry, CategoryCache};
use crate::circuit_breaker::{BreakerState, CandidateBreakerConfig};
use crate::clients::{build_sink, build_sources, DataSink};
use crate::config::{CacheTtls, DataConfig, ProviderKind};
use crate::error::{ConfigError, DataError, ExtractionError};
use crate::fallback::FallbackProvider;
use crate::models::{
    CacheState, CategoryData, CategoryRefresh, DataCategory, DataEnvelope, Fixture,
    LeaguePosition, Player, RefreshResult, RefreshTarget, FALLBACK_SOURCE,
};
use crate::providers::ExtractorRegistry;
use crate::retrieval::{CandidateChain, DocumentSource};
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

type FetchOutcome = Result<Arc<CacheEntry>, DataError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct FacadeInner {
    chain: CandidateChain,
    registry: ExtractorRegistry,
    cache: CategoryCache,
    fallback: FallbackProvider,
    sink: Option<Arc<dyn DataSink>>,
    in_flight: Mutex<HashMap<DataCategory, SharedFetch>>,
}

/// Facade over retrieval, extraction, cache and fallback
#[derive(Clone)]
pub struct ClubDataFacade {
    inner: Arc<FacadeInner>,
}

/// Assembles a facade from explicit parts
pub struct FacadeBuilder {
    sources: Vec<Arc<dyn DocumentSource>>,
    breaker: CandidateBreakerConfig,
    registry: Option<ExtractorRegistry>,
    ttls: CacheTtls,
    sink: Option<Arc<dyn DataSink>>,
}

impl FacadeBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            breaker: CandidateBreakerConfig::default(),
            registry: None,
            ttls: CacheTtls::default(),
            sink: None,
        }
    }

    /// Append a retrieval candidate
    pub fn source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = Arc<dyn DocumentSource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn breaker(mut self, breaker: CandidateBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DataSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> ClubDataFacade {
        let registry = self
            .registry
            .unwrap_or_else(|| ExtractorRegistry::with_defaults(&DataConfig::default()));
        let chain = CandidateChain::new(self.sources, self.breaker);

        info!(
            "ClubDataFacade ready: {} (write-through: {})",
            chain.name(),
            self.sink
                .as_ref()
                .map(|s| s.sink_name().to_string())
                .unwrap_or_else(|| "off".to_string())
        );

        ClubDataFacade {
            inner: Arc::new(FacadeInner {
                chain,
                registry,
                cache: CategoryCache::new(self.ttls),
                fallback: FallbackProvider::new(),
                sink: self.sink,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Default for FacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClubDataFacade {
    pub fn builder() -> FacadeBuilder {
        FacadeBuilder::new()
    }

    /// Build the facade with the HTTP candidates described by `config`
    pub fn from_config(config: DataConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = FacadeBuilder::new()
            .sources(build_sources(&config))
            .breaker(config.breaker.clone())
            .registry(ExtractorRegistry::with_defaults(&config))
            .ttls(config.ttls);
        if let Some(sink) = build_sink(&config) {
            builder = builder.sink(sink);
        }
        Ok(builder.build())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_squad(&self) -> DataEnvelope<Vec<Player>> {
        self.read(
            DataCategory::Squad,
            |data| match data {
                CategoryData::Squad(players) => Some(players.clone()),
                _ => None,
            },
            |fallback| fallback.squad(),
        )
        .await
    }

    /// The `limit` most recent played fixtures.
    ///
    /// Ordered oldest first, so the last element is the latest result. Callers
    /// wanting a most-recent-first list reverse it.
    pub async fn get_past_fixtures(&self, limit: usize) -> DataEnvelope<Vec<Fixture>> {
        self.read(
            DataCategory::Fixtures,
            |data| match data {
                CategoryData::Fixtures(set) => Some(set.recent_past(limit)),
                _ => None,
            },
            |fallback| fallback.past_fixtures(limit),
        )
        .await
    }

    /// The next `limit` scheduled fixtures, soonest first
    pub async fn get_upcoming_fixtures(&self, limit: usize) -> DataEnvelope<Vec<Fixture>> {
        self.read(
            DataCategory::Fixtures,
            |data| match data {
                CategoryData::Fixtures(set) => Some(set.next_upcoming(limit)),
                _ => None,
            },
            |fallback| fallback.upcoming_fixtures(limit),
        )
        .await
    }

    pub async fn get_league_position(&self) -> DataEnvelope<LeaguePosition> {
        self.read(
            DataCategory::Standings,
            |data| match data {
                CategoryData::Standings(position) => Some(position.clone()),
                _ => None,
            },
            |fallback| fallback.league_position(),
        )
        .await
    }

    // ========================================================================
    // Refresh & status
    // ========================================================================

    /// Drop cached entries for `target` and refetch them concurrently.
    ///
    /// Each category succeeds or falls back on its own; other categories'
    /// cache entries are untouched.
    pub async fn force_refresh(&self, target: impl Into<RefreshTarget>) -> RefreshResult {
        let categories = target.into().categories();
        for &category in &categories {
            self.inner.cache.invalidate(category);
        }

        let refreshes = join_all(categories.iter().map(|&category| async move {
            match self.load(category, true).await {
                Ok(entry) => CategoryRefresh {
                    category,
                    updated: true,
                    record_count: entry.data.record_count(),
                    source: entry.source.clone(),
                },
                Err(e) => {
                    warn!("Refresh of {} failed, serving fallback: {}", category, e);
                    CategoryRefresh {
                        category,
                        updated: false,
                        record_count: self.inner.fallback.record_count(category),
                        source: FALLBACK_SOURCE.to_string(),
                    }
                }
            }
        }))
        .await;

        let result = RefreshResult::from_categories(refreshes);
        info!(
            "Force refresh finished: success={} {}",
            result.success,
            result.message.as_deref().unwrap_or_default()
        );
        result
    }

    pub fn cache_status(&self) -> BTreeMap<DataCategory, CacheState> {
        self.inner.cache.status()
    }

    /// Refetch every expired category; returns the ones now holding live data
    pub async fn revalidate(&self) -> Vec<DataCategory> {
        let expired = self.inner.cache.expired();
        if expired.is_empty() {
            return expired;
        }

        let outcomes = join_all(expired.iter().map(|&category| async move {
            match self.load(category, false).await {
                Ok(_) => Some(category),
                Err(e) => {
                    warn!("Revalidation of {} failed: {}", category, e);
                    None
                }
            }
        }))
        .await;

        outcomes.into_iter().flatten().collect()
    }

    /// Breaker state per candidate and category, in chain order
    pub fn candidate_states(&self) -> Vec<(String, BTreeMap<DataCategory, BreakerState>)> {
        self.inner.chain.breaker_states()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn read<T>(
        &self,
        category: DataCategory,
        select: impl FnOnce(&CategoryData) -> Option<T>,
        fallback: impl FnOnce(&FallbackProvider) -> T,
    ) -> DataEnvelope<T> {
        let entry = match self.load(category, false).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Serving fallback {}: {}", category, e);
                return DataEnvelope::fallback(fallback(&self.inner.fallback));
            }
        };

        match select(&entry.data) {
            Some(data) => DataEnvelope {
                data,
                is_live: entry.is_live,
                source: entry.source.clone(),
                last_updated: Some(entry.fetched_at),
            },
            None => {
                warn!(
                    "Cached {} entry holds {} data, serving fallback",
                    category,
                    entry.data.category()
                );
                DataEnvelope::fallback(fallback(&self.inner.fallback))
            }
        }
    }

    /// Valid cache entry, or the result of a (possibly shared) live fetch
    async fn load(&self, category: DataCategory, force: bool) -> FetchOutcome {
        if !force {
            if let Some(entry) = self.inner.cache.get_valid(category) {
                return Ok(entry);
            }
        }
        self.shared_fetch(category).await
    }

    fn shared_fetch(&self, category: DataCategory) -> SharedFetch {
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(fetch) = in_flight.get(&category) {
            return fetch.clone();
        }

        let inner = self.inner.clone();
        let fetch = async move {
            let outcome = inner.fetch_live(category).await;
            inner.in_flight.lock().remove(&category);
            outcome
        }
        .boxed()
        .shared();

        in_flight.insert(category, fetch.clone());
        fetch
    }
}

impl FacadeInner {
    async fn fetch_live(&self, category: DataCategory) -> FetchOutcome {
        let document = self.chain.fetch(category).await?;
        let data = self.registry.extract(&document, category)?;
        if data.category() != category {
            return Err(ExtractionError::WrongBody {
                provider: document.provider,
                expected: category.as_str(),
            }
            .into());
        }
        data.ensure_usable()?;

        let entry = self
            .cache
            .store(CacheEntry::live(data, document.source_id.clone()));

        if document.provider != ProviderKind::Backend {
            self.write_through(entry.clone());
        }
        Ok(entry)
    }

    fn write_through(&self, entry: Arc<CacheEntry>) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = sink.push(&entry.data).await {
                warn!(
                    "Write-through of {} to {} failed: {:#}",
                    entry.data.category(),
                    sink.sink_name(),
                    e
                );
            }
        });
    }
}
