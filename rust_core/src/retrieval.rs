//! Retrieval strategy
//!
//! Tries an ordered list of candidate sources (API, direct page fetch, relay
//! mirrors, backend service) and returns the first raw document any of them
//! delivers. Each attempt runs under its own timeout; dropping the timed-out
//! future cancels the underlying HTTP request.
//!
//! The chain never parses documents and never falls back to static data.

use crate::circuit_breaker::{BreakerState, CandidateBreaker, CandidateBreakerConfig};
use crate::config::ProviderKind;
use crate::error::RetrievalError;
use crate::models::DataCategory;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Unparsed payload from a candidate
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBody {
    Html(String),
    Json(serde_json::Value),
}

impl DocumentBody {
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentBody::Html(_) => "html",
            DocumentBody::Json(_) => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Selects the extractor
    pub provider: ProviderKind,
    /// Candidate that served the document, reported as the envelope source
    pub source_id: String,
    /// Team id the provider resolved for the club, when it has one
    pub team_id: Option<u64>,
    pub body: DocumentBody,
}

/// A single retrieval candidate
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Stable id for logging and envelopes, e.g. `mirror:api.allorigins.win`
    fn source_id(&self) -> &str;

    fn provider(&self) -> ProviderKind;

    /// Upper bound for one attempt
    fn timeout(&self) -> Duration;

    fn serves(&self, _category: DataCategory) -> bool {
        true
    }

    async fn fetch(&self, category: DataCategory) -> Result<RawDocument, RetrievalError>;
}

struct Candidate {
    source: Arc<dyn DocumentSource>,
    breaker: CandidateBreaker,
}

/// Ordered fallback chain of document sources
pub struct CandidateChain {
    candidates: Vec<Candidate>,
    /// Chain name for logging
    name: String,
}

impl CandidateChain {
    pub fn new(sources: Vec<Arc<dyn DocumentSource>>, breaker: CandidateBreakerConfig) -> Self {
        let ids: Vec<&str> = sources.iter().map(|s| s.source_id()).collect();
        let name = format!("CandidateChain({})", ids.join(" → "));

        let candidates = sources
            .into_iter()
            .map(|source| Candidate {
                breaker: CandidateBreaker::new(source.source_id(), breaker.clone()),
                source,
            })
            .collect();

        Self { candidates, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Breaker state per candidate and category, in chain order
    pub fn breaker_states(&self) -> Vec<(String, BTreeMap<DataCategory, BreakerState>)> {
        self.candidates
            .iter()
            .map(|c| (c.source.source_id().to_string(), c.breaker.states()))
            .collect()
    }

    /// Fetch a raw document for `category` from the first candidate that delivers.
    ///
    /// Each candidate is attempted at most once per call.
    pub async fn fetch(&self, category: DataCategory) -> Result<RawDocument, RetrievalError> {
        let mut attempts = 0usize;
        let mut last_error: Option<RetrievalError> = None;

        for candidate in &self.candidates {
            let source = candidate.source.as_ref();
            let source_id = source.source_id();

            if !source.serves(category) {
                continue;
            }

            if !candidate.breaker.is_available(category) {
                debug!("Skipping {} for {} (breaker open)", source_id, category);
                last_error = Some(RetrievalError::CircuitOpen {
                    source_id: source_id.to_string(),
                });
                continue;
            }

            attempts += 1;
            let timeout = source.timeout();
            let started = Instant::now();

            let outcome = match tokio::time::timeout(timeout, source.fetch(category)).await {
                Ok(result) => result,
                Err(_) => Err(RetrievalError::Timeout {
                    source_id: source_id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Ok(document) => {
                    candidate.breaker.record_success(category);
                    info!(
                        "{} served {} ({} body) in {}ms",
                        source_id,
                        category,
                        document.body.kind(),
                        started.elapsed().as_millis()
                    );
                    return Ok(document);
                }
                Err(e) => {
                    candidate.breaker.record_failure(category);
                    warn!("{} failed for {}: {}", source_id, category, e);
                    last_error = Some(e);
                }
            }
        }

        Err(RetrievalError::Exhausted {
            category,
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no candidate serves this category".to_string()),
        })
    }
}
