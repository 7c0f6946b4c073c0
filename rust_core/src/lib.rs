//! Club Data Core - Data acquisition and caching for a football club site.
//!
//! This module provides:
//! - Ordered candidate retrieval (API-Football, FBref page and relay mirrors, backend)
//! - Per-provider extraction of squad, fixtures and league position
//! - Per-category TTL cache with at most one in-flight fetch per category
//! - Static fallback data whenever every live path fails
//! - Circuit breakers per retrieval candidate
//! - Optional write-through of fresh data to the backend service

pub mod cache;
pub mod circuit_breaker;
pub mod clients;
pub mod club;
pub mod config;
pub mod error;
pub mod facade;
pub mod fallback;
pub mod models;
pub mod providers;
pub mod retrieval;

pub use cache::{CacheEntry, CategoryCache};
pub use club::ClubIdentity;
pub use config::{CacheTtls, DataConfig, ProviderConfig, ProviderKind};
pub use error::{ConfigError, DataError, ExtractionError, RetrievalError};
pub use facade::{ClubDataFacade, FacadeBuilder};
pub use fallback::FallbackProvider;
pub use models::*;
pub use retrieval::{CandidateChain, DocumentBody, DocumentSource, RawDocument};
