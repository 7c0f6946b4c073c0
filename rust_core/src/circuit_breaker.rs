//! Per-candidate circuit breaker.
//!
//! A retrieval candidate that keeps failing (dead mirror, exhausted API quota)
//! is skipped for a recovery window instead of burning its full timeout on
//! every fetch. After the window one trial request is let through (half-open).
//!
//! Each category has its own circuit: a candidate whose standings endpoint is
//! broken still serves squad and fixtures.

use crate::models::DataCategory;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RECOVERY_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed
    Closed,
    /// Requests are skipped until the recovery timeout elapses
    Open,
    /// A trial request is allowed
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CandidateBreakerConfig {
    /// Number of consecutive failures to trip a circuit
    pub failure_threshold: u32,
    /// Duration to wait before attempting recovery
    pub recovery_timeout: Duration,
    /// Number of successful trial requests needed to close again
    pub success_threshold: u32,
}

impl Default for CandidateBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(DEFAULT_RECOVERY_SECS),
            success_threshold: 1,
        }
    }
}

impl CandidateBreakerConfig {
    /// Breaker that never opens
    pub fn disabled() -> Self {
        Self {
            failure_threshold: u32::MAX,
            ..Self::default()
        }
    }
}

/// State of one (candidate, category) pair
#[derive(Debug, Clone, Copy)]
struct Circuit {
    state: BreakerState,
    failures: u32,
    trial_successes: u32,
    opened_at: Option<Instant>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: BreakerState::Closed,
            failures: 0,
            trial_successes: 0,
            opened_at: None,
        }
    }
}

impl Circuit {
    fn trip(&mut self) {
        self.state = BreakerState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_successes = 0;
    }
}

pub struct CandidateBreaker {
    name: String,
    config: CandidateBreakerConfig,
    circuits: Mutex<HashMap<DataCategory, Circuit>>,
}

impl std::fmt::Debug for CandidateBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateBreaker")
            .field("name", &self.name)
            .field("states", &self.states())
            .finish()
    }
}

impl CandidateBreaker {
    pub fn new(name: &str, config: CandidateBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    /// Whether the candidate may be attempted for `category` now.
    ///
    /// Moves an open circuit to half-open once the recovery timeout passed.
    pub fn is_available(&self, category: DataCategory) -> bool {
        let mut circuits = self.circuits.lock();
        let circuit = circuits.entry(category).or_default();

        if circuit.state != BreakerState::Open {
            return true;
        }
        let recovered = circuit
            .opened_at
            .map(|at| at.elapsed() >= self.config.recovery_timeout)
            .unwrap_or(true);
        if recovered {
            circuit.state = BreakerState::HalfOpen;
            circuit.trial_successes = 0;
            debug!("Candidate '{}' half-open for {}, retrying", self.name, category);
        }
        recovered
    }

    pub fn record_success(&self, category: DataCategory) {
        let mut circuits = self.circuits.lock();
        let circuit = circuits.entry(category).or_default();
        circuit.failures = 0;

        if circuit.state == BreakerState::HalfOpen {
            circuit.trial_successes = circuit.trial_successes.saturating_add(1);
            if circuit.trial_successes < self.config.success_threshold {
                return;
            }
            info!("Candidate '{}' recovered for {}", self.name, category);
        }
        *circuit = Circuit::default();
    }

    pub fn record_failure(&self, category: DataCategory) {
        let mut circuits = self.circuits.lock();
        let circuit = circuits.entry(category).or_default();
        circuit.failures = circuit.failures.saturating_add(1);

        match circuit.state {
            BreakerState::Closed if circuit.failures >= self.config.failure_threshold => {
                circuit.trip();
                warn!(
                    "Candidate '{}' disabled for {} after {} consecutive failures",
                    self.name, category, circuit.failures
                );
            }
            BreakerState::HalfOpen => {
                circuit.trip();
                warn!(
                    "Candidate '{}' failed its {} recovery attempt",
                    self.name, category
                );
            }
            _ => {}
        }
    }

    pub fn state(&self, category: DataCategory) -> BreakerState {
        self.circuits
            .lock()
            .get(&category)
            .map(|c| c.state)
            .unwrap_or(BreakerState::Closed)
    }

    /// State of every category
    pub fn states(&self) -> BTreeMap<DataCategory, BreakerState> {
        DataCategory::ALL
            .iter()
            .map(|&category| (category, self.state(category)))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_count(&self, category: DataCategory) -> u32 {
        self.circuits
            .lock()
            .get(&category)
            .map(|c| c.failures)
            .unwrap_or(0)
    }
}
