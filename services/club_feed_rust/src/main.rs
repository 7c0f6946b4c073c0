mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use club_data_core::clients::BackendClient;
use club_data_core::{ClubDataFacade, DataConfig, RefreshTarget};
use dotenv::dotenv;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting club feed service...");

    // Config
    let config = Config::from_env();
    let data_config = DataConfig::from_env();
    info!(
        "Club: {} ({} retrieval candidates)",
        data_config.club.name,
        data_config.candidate_count()
    );

    // Backend
    if let Some(backend) = data_config.backend().cloned() {
        let client = BackendClient::new(backend);
        if config.backend_refresh_on_start {
            match client.request_refresh().await {
                Ok(reply) => info!("Backend refresh requested: {}", reply),
                Err(e) => warn!("Backend refresh request failed: {:#}", e),
            }
        }
        match client.status().await {
            Ok(status) => info!("Backend status: {}", status),
            Err(e) => warn!("Backend unreachable at startup: {:#}", e),
        }
    }

    // Facade
    let facade =
        ClubDataFacade::from_config(data_config).context("Invalid club data configuration")?;

    // Warm every category
    let warmup = facade.force_refresh(RefreshTarget::All).await;
    info!(
        "Initial load: {}",
        serde_json::to_string(&warmup).context("Failed to serialize refresh result")?
    );

    let mut tasks = Vec::new();

    // 1. Revalidation Loop
    let revalidator = facade.clone();
    let interval_secs = config.revalidate_interval_secs;
    tasks.push(tokio::spawn(async move {
        info!("Revalidation loop started (interval: {}s)", interval_secs);
        loop {
            tokio::time::sleep(Duration::from_secs(interval_secs)).await;
            let refreshed = revalidator.revalidate().await;
            if !refreshed.is_empty() {
                info!("Revalidated: {:?}", refreshed);
            }
        }
    }));

    // 2. Status Loop
    let reporter = facade.clone();
    let status_secs = config.status_interval_secs;
    let fixture_limit = config.fixture_limit;
    tasks.push(tokio::spawn(async move {
        info!("Status loop started (interval: {}s)", status_secs);
        loop {
            let squad = reporter.get_squad().await;
            let past = reporter.get_past_fixtures(fixture_limit).await;
            let upcoming = reporter.get_upcoming_fixtures(fixture_limit).await;
            let position = reporter.get_league_position().await;

            info!(
                "Squad: {} players from {} (live: {})",
                squad.data.len(),
                squad.source,
                squad.is_live
            );
            info!(
                "Fixtures: {} past / {} upcoming from {} (live: {})",
                past.data.len(),
                upcoming.data.len(),
                upcoming.source,
                upcoming.is_live
            );
            info!(
                "League position: {} with {} points from {} (live: {})",
                position.data.position, position.data.points, position.source, position.is_live
            );
            match serde_json::to_string(&reporter.cache_status()) {
                Ok(status) => info!("Cache status: {}", status),
                Err(e) => error!("Failed to serialize cache status: {}", e),
            }
            for (candidate, states) in reporter.candidate_states() {
                info!("Candidate {}: {:?}", candidate, states);
            }

            tokio::time::sleep(Duration::from_secs(status_secs)).await;
        }
    }));

    // Wait for signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    for task in tasks {
        task.abort();
    }

    Ok(())
}
