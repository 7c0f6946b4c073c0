//! Integration tests for the club data facade
//!
//! These tests drive the facade through scripted document sources and never
//! touch the network.

use async_trait::async_trait;
use club_data_core::clients::DataSink;
use club_data_core::circuit_breaker::{BreakerState, CandidateBreakerConfig};
use club_data_core::{
    CacheState, CacheTtls, CategoryData, ClubDataFacade, DataCategory, DocumentBody,
    DocumentSource, FallbackProvider, MatchResult, ProviderKind, RawDocument, RefreshTarget,
    RetrievalError, FALLBACK_SOURCE,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scripted candidate: answers per category, counts calls
struct MockSource {
    id: String,
    provider: ProviderKind,
    delay: Duration,
    category_delays: Mutex<HashMap<DataCategory, Duration>>,
    timeout: Duration,
    responses: Mutex<HashMap<DataCategory, Result<Value, u16>>>,
    calls: AtomicU32,
}

impl MockSource {
    fn new(id: &str, provider: ProviderKind) -> Self {
        Self {
            id: id.to_string(),
            provider,
            delay: Duration::ZERO,
            category_delays: Mutex::new(HashMap::new()),
            timeout: Duration::from_secs(2),
            responses: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Backend-shaped source serving every category
    fn backend() -> Self {
        let source = Self::new("backend", ProviderKind::Backend);
        source.set(DataCategory::Squad, Ok(squad_body(3)));
        source.set(DataCategory::Fixtures, Ok(fixtures_body()));
        source.set(DataCategory::Standings, Ok(standings_body(5, 42, 20, 11, 11)));
        source
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the response delay for one category
    fn set_delay(&self, category: DataCategory, delay: Duration) {
        self.category_delays.lock().insert(category, delay);
    }

    fn set(&self, category: DataCategory, response: Result<Value, u16>) {
        self.responses.lock().insert(category, response);
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, category: DataCategory) -> Result<RawDocument, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .category_delays
            .lock()
            .get(&category)
            .copied()
            .unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().get(&category).cloned();
        match response {
            Some(Ok(body)) => Ok(RawDocument {
                provider: self.provider,
                source_id: self.id.clone(),
                team_id: None,
                body: DocumentBody::Json(body),
            }),
            Some(Err(status)) => Err(RetrievalError::Status {
                source_id: self.id.clone(),
                status,
            }),
            None => Err(RetrievalError::Status {
                source_id: self.id.clone(),
                status: 404,
            }),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    pushed: Mutex<Vec<DataCategory>>,
}

#[async_trait]
impl DataSink for RecordingSink {
    fn sink_name(&self) -> &str {
        "recording"
    }

    async fn push(&self, data: &CategoryData) -> anyhow::Result<()> {
        self.pushed.lock().push(data.category());
        Ok(())
    }
}

fn squad_body(count: u64) -> Value {
    let players: Vec<Value> = (1..=count)
        .map(|i| json!({ "id": i, "name": format!("Player {}", i), "number": i, "position": "MF", "age": 24 }))
        .collect();
    json!({ "success": true, "data": { "squad": players } })
}

fn fixture(id: u64, date: &str, home: &str, away: &str, score: Option<(u16, u16)>) -> Value {
    json!({
        "id": id,
        "date": date,
        "homeTeam": home,
        "awayTeam": away,
        "homeLogo": "",
        "awayLogo": "",
        "venue": "El Sardinero",
        "competition": "Segunda División",
        "homeScore": score.map(|s| s.0),
        "awayScore": score.map(|s| s.1),
    })
}

fn fixtures_body() -> Value {
    json!({ "success": true, "data": {
        "pastFixtures": [
            fixture(1, "2024-11-10T20:00:00Z", "Racing de Santander", "Burgos", Some((2, 0))),
            fixture(2, "2024-11-17T18:00:00Z", "Eibar", "Racing de Santander", Some((1, 1))),
            fixture(3, "2024-11-24T21:00:00Z", "Racing de Santander", "Leganés", Some((0, 1))),
        ],
        "upcomingFixtures": [
            fixture(4, "2025-01-12T20:00:00Z", "Racing de Santander", "Real Oviedo", None),
            fixture(5, "2025-01-19T18:00:00Z", "Sporting Gijón", "Racing de Santander", None),
        ]
    } })
}

fn standings_body(position: u32, played: u32, won: u32, drawn: u32, lost: u32) -> Value {
    json!({ "success": true, "data": { "leaguePosition": {
        "position": position, "points": won * 3 + drawn, "played": played,
        "won": won, "drawn": drawn, "lost": lost, "goalDifference": 14
    } } })
}

fn facade_with(sources: Vec<Arc<MockSource>>) -> ClubDataFacade {
    ClubDataFacade::builder()
        .sources(sources.into_iter().map(|s| s as Arc<dyn DocumentSource>))
        .breaker(CandidateBreakerConfig::disabled())
        .build()
}

#[tokio::test]
async fn test_cached_reads_do_not_refetch() {
    let source = MockSource::backend().shared();
    let facade = facade_with(vec![source.clone()]);

    let first = facade.get_squad().await;
    let second = facade.get_squad().await;

    assert!(first.is_live);
    assert_eq!(first.source, "backend");
    assert_eq!(first.data.len(), 3);
    assert_eq!(first.last_updated, second.last_updated);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_fixture_reads_share_one_cache_entry() {
    let source = MockSource::backend().shared();
    let facade = facade_with(vec![source.clone()]);

    let past = facade.get_past_fixtures(2).await;
    let upcoming = facade.get_upcoming_fixtures(5).await;

    assert!(past.is_live && upcoming.is_live);
    // The two most recent, oldest first
    assert_eq!(past.data.iter().map(|f| f.id).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(past.data[0].result, Some(MatchResult::Draw));
    assert_eq!(past.data[1].result, Some(MatchResult::Loss));
    assert_eq!(upcoming.data.len(), 2);
    assert!(upcoming.data.iter().all(|f| f.result.is_none()));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_ttl_expiry_triggers_refetch() {
    let source = MockSource::backend().shared();
    let facade = ClubDataFacade::builder()
        .source(source.clone() as Arc<dyn DocumentSource>)
        .ttls(CacheTtls {
            squad: Duration::from_secs(60),
            fixtures: Duration::from_millis(100),
            standings: Duration::from_secs(60),
        })
        .build();

    facade.get_squad().await;
    facade.get_upcoming_fixtures(5).await;
    assert_eq!(source.calls(), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(facade.cache_status()[&DataCategory::Fixtures], CacheState::Expired);
    assert_eq!(facade.cache_status()[&DataCategory::Squad], CacheState::Valid);

    facade.get_squad().await;
    facade.get_upcoming_fixtures(5).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_total_failure_serves_fallback() {
    let source = MockSource::new("dead", ProviderKind::Backend).shared();
    let facade = facade_with(vec![source.clone()]);
    let fallback = FallbackProvider::new();

    let squad = facade.get_squad().await;
    let position = facade.get_league_position().await;
    let past = facade.get_past_fixtures(10).await;

    assert!(!squad.is_live);
    assert_eq!(squad.source, FALLBACK_SOURCE);
    assert!(squad.last_updated.is_none());
    assert_eq!(squad.data, fallback.squad());
    assert_eq!(position.data, fallback.league_position());
    assert_eq!(past.data, fallback.past_fixtures(10));

    // Fallback data is never cached
    assert!(facade
        .cache_status()
        .values()
        .all(|state| *state == CacheState::Expired));
    facade.get_squad().await;
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_candidates_tried_in_order() {
    let failing = MockSource::new("mirror:dead.example", ProviderKind::Backend).shared();
    let working = MockSource::backend().shared();
    let facade = facade_with(vec![failing.clone(), working.clone()]);

    let squad = facade.get_squad().await;
    assert!(squad.is_live);
    assert_eq!(squad.source, "backend");
    assert_eq!(failing.calls(), 1);
    assert_eq!(working.calls(), 1);
}

#[tokio::test]
async fn test_slow_candidate_times_out() {
    let slow = MockSource::new("slow", ProviderKind::Backend)
        .with_delay(Duration::from_millis(500))
        .with_timeout(Duration::from_millis(50));
    slow.set(DataCategory::Squad, Ok(squad_body(1)));
    let slow = slow.shared();
    let working = MockSource::backend().shared();
    let facade = facade_with(vec![slow.clone(), working.clone()]);

    let started = Instant::now();
    let squad = facade.get_squad().await;

    assert_eq!(squad.source, "backend");
    assert_eq!(squad.data.len(), 3);
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_categories_load_independently() {
    let source = MockSource::backend().with_delay(Duration::from_millis(150));
    source.set(DataCategory::Squad, Err(503));
    let source = source.shared();
    let facade = facade_with(vec![source.clone()]);

    let started = Instant::now();
    let (squad, fixtures, position) = tokio::join!(
        facade.get_squad(),
        facade.get_upcoming_fixtures(5),
        facade.get_league_position()
    );

    // Three fetches overlapped instead of running back to back
    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(!squad.is_live);
    assert!(fixtures.is_live);
    assert!(position.is_live);
    assert_eq!(position.data.position, 5);
}

#[tokio::test]
async fn test_slow_fixtures_do_not_block_standings() {
    let source = MockSource::backend().with_timeout(Duration::from_millis(600));
    source.set_delay(DataCategory::Fixtures, Duration::from_secs(2));
    let source = source.shared();
    let facade = facade_with(vec![source.clone()]);

    let pending = tokio::spawn({
        let facade = facade.clone();
        async move { facade.get_upcoming_fixtures(5).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    let position = facade.get_league_position().await;
    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(position.is_live);
    assert_eq!(position.data.position, 5);
    assert!(!pending.is_finished());

    // The fixtures read gives up at the candidate timeout
    let fixtures = pending.await.unwrap();
    assert!(!fixtures.is_live);
    assert_eq!(fixtures.source, FALLBACK_SOURCE);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_fetch() {
    let source = MockSource::backend()
        .with_delay(Duration::from_millis(100))
        .shared();
    let facade = facade_with(vec![source.clone()]);

    let (a, b, c, d) = tokio::join!(
        facade.get_squad(),
        facade.get_squad(),
        facade.get_squad(),
        facade.get_squad()
    );

    assert_eq!(source.calls(), 1);
    assert!(a.is_live && b.is_live && c.is_live && d.is_live);
    assert_eq!(a.last_updated, d.last_updated);
}

#[tokio::test]
async fn test_force_refresh_isolates_categories() {
    let source = MockSource::backend().shared();
    let facade = facade_with(vec![source.clone()]);

    facade.get_squad().await;
    facade.get_upcoming_fixtures(5).await;
    facade.get_league_position().await;

    source.set(DataCategory::Squad, Err(500));
    let result = facade.force_refresh(DataCategory::Squad).await;

    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("serving fallback for: squad"));
    assert_eq!(result.categories.len(), 1);
    assert_eq!(result.categories[0].source, FALLBACK_SOURCE);

    let status = facade.cache_status();
    assert_eq!(status[&DataCategory::Squad], CacheState::Expired);
    assert_eq!(status[&DataCategory::Fixtures], CacheState::Valid);
    assert_eq!(status[&DataCategory::Standings], CacheState::Valid);

    let squad = facade.get_squad().await;
    assert!(!squad.is_live);
}

#[tokio::test]
async fn test_force_refresh_all() {
    let source = MockSource::backend().shared();
    let facade = facade_with(vec![source.clone()]);

    facade.get_squad().await;
    let result = facade.force_refresh(RefreshTarget::All).await;

    assert!(result.success);
    // 3 players + 5 fixtures + 1 standings row
    assert_eq!(result.record_count, Some(9));
    assert_eq!(result.message.as_deref(), Some("refreshed 9 records"));
    assert_eq!(source.calls(), 4);
    assert!(facade
        .cache_status()
        .values()
        .all(|state| *state == CacheState::Valid));
}

#[tokio::test]
async fn test_inconsistent_standings_are_rejected() {
    let source = MockSource::backend().shared();
    // 20 + 11 + 10 != 42
    source.set(DataCategory::Standings, Ok(standings_body(5, 42, 20, 11, 10)));
    let facade = facade_with(vec![source]);

    let position = facade.get_league_position().await;
    assert!(!position.is_live);
    assert_eq!(position.data, FallbackProvider::new().league_position());
    assert_eq!(facade.cache_status()[&DataCategory::Standings], CacheState::Expired);
}

#[tokio::test]
async fn test_overflowing_standings_record_falls_back() {
    let source = MockSource::backend().shared();
    source.set(
        DataCategory::Standings,
        Ok(json!({ "success": true, "data": { "leaguePosition": {
            "position": 5, "points": 71, "played": 42,
            "won": 4294967295u32, "drawn": 11, "lost": 11, "goalDifference": 14
        } } })),
    );
    let facade = facade_with(vec![source]);

    let position = facade.get_league_position().await;
    assert!(!position.is_live);
    assert_eq!(position.source, FALLBACK_SOURCE);
    assert_eq!(position.data, FallbackProvider::new().league_position());
}

#[tokio::test]
async fn test_empty_squad_is_rejected() {
    let source = MockSource::backend().shared();
    source.set(DataCategory::Squad, Ok(json!({ "data": { "squad": [] } })));
    let facade = facade_with(vec![source]);

    let squad = facade.get_squad().await;
    assert!(!squad.is_live);
    assert_eq!(squad.data.len(), FallbackProvider::new().squad().len());
}

#[tokio::test]
async fn test_malformed_rows_are_skipped() {
    let source = MockSource::backend().shared();
    source.set(
        DataCategory::Squad,
        Ok(json!({ "data": { "squad": [
            { "id": 1, "name": "Íñigo Vicente", "number": 10, "position": "M" },
            { "id": 2, "name": "" },
            { "number": "N/A" },
            { "id": 4, "name": "Peque", "number": "N/A", "position": "F" }
        ] } })),
    );
    let facade = facade_with(vec![source]);

    let squad = facade.get_squad().await;
    assert!(squad.is_live);
    assert_eq!(
        squad.data.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["Íñigo Vicente", "Peque"]
    );
    assert_eq!(squad.data[1].number, None);
}

#[tokio::test]
async fn test_revalidate_refreshes_expired_only() {
    let source = MockSource::backend().shared();
    source.set(DataCategory::Standings, Err(502));
    let facade = facade_with(vec![source.clone()]);

    facade.get_squad().await;
    assert_eq!(source.calls(), 1);

    let refreshed = facade.revalidate().await;
    assert_eq!(refreshed, vec![DataCategory::Fixtures]);
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_write_through_skips_backend_data() {
    let api = MockSource::new("api-football", ProviderKind::ApiFootball);
    api.set(
        DataCategory::Squad,
        Ok(json!({ "response": [{
            "player": { "id": 10, "name": "Íñigo Vicente", "age": 27, "nationality": "Spain" },
            "statistics": [{ "games": { "position": "Midfielder", "number": 10 } }]
        }] })),
    );
    let api = api.shared();
    let backend = MockSource::backend().shared();
    let sink = Arc::new(RecordingSink::default());

    let facade = ClubDataFacade::builder()
        .source(api.clone() as Arc<dyn DocumentSource>)
        .source(backend.clone() as Arc<dyn DocumentSource>)
        .breaker(CandidateBreakerConfig::disabled())
        .sink(sink.clone() as Arc<dyn DataSink>)
        .build();

    let squad = facade.get_squad().await;
    assert_eq!(squad.source, "api-football");

    // Fixtures come from the backend itself
    let fixtures = facade.get_upcoming_fixtures(5).await;
    assert_eq!(fixtures.source, "backend");

    for _ in 0..50 {
        if !sink.pushed.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*sink.pushed.lock(), vec![DataCategory::Squad]);
}

#[tokio::test]
async fn test_open_breaker_skips_candidate() {
    let flaky = MockSource::new("flaky", ProviderKind::Backend).shared();
    let backend = MockSource::backend().shared();
    let facade = ClubDataFacade::builder()
        .source(flaky.clone() as Arc<dyn DocumentSource>)
        .source(backend.clone() as Arc<dyn DocumentSource>)
        .breaker(CandidateBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 1,
        })
        .build();

    facade.force_refresh(DataCategory::Squad).await;
    facade.force_refresh(DataCategory::Squad).await;
    facade.force_refresh(DataCategory::Squad).await;

    // Two failures open the breaker; the third refresh goes straight to the backend
    assert_eq!(flaky.calls(), 2);
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_failing_category_keeps_candidate_for_others() {
    let source = MockSource::backend();
    source.set(DataCategory::Standings, Err(500));
    let source = source.shared();
    let facade = ClubDataFacade::builder()
        .source(source.clone() as Arc<dyn DocumentSource>)
        .breaker(CandidateBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 1,
        })
        .build();

    for _ in 0..3 {
        let refresh = facade.force_refresh(DataCategory::Standings).await;
        assert_eq!(refresh.categories[0].source, FALLBACK_SOURCE);
    }
    // The third refresh is skipped by the open standings circuit
    assert_eq!(source.calls(), 2);

    let squad = facade.get_squad().await;
    assert!(squad.is_live);
    assert_eq!(squad.source, "backend");
    let past = facade.get_past_fixtures(5).await;
    assert!(past.is_live);
    assert_eq!(source.calls(), 4);

    let states = facade.candidate_states();
    assert_eq!(states[0].0, "backend");
    assert_eq!(states[0].1[&DataCategory::Standings], BreakerState::Open);
    assert_eq!(states[0].1[&DataCategory::Squad], BreakerState::Closed);
    assert_eq!(states[0].1[&DataCategory::Fixtures], BreakerState::Closed);
}

#[test]
fn test_fallback_records_are_consistent() {
    let fallback = FallbackProvider::new();

    assert_eq!(fallback.squad().len(), 12);
    assert!(fallback.league_position().validate().is_ok());
    assert_eq!(fallback.past_fixtures(10).len(), 3);
    assert_eq!(fallback.upcoming_fixtures(10).len(), 5);
    assert!(fallback
        .past_fixtures(10)
        .iter()
        .all(|f| f.is_played() && f.result.is_some()));
    assert!(fallback
        .upcoming_fixtures(10)
        .iter()
        .all(|f| !f.is_played() && f.result.is_none()));
}
