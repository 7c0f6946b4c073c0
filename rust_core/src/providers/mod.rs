//! Source extractors
//!
//! Defines the DocumentExtractor trait that turns a provider's raw document
//! into normalized club records:
//! - API-Football: JSON `response` arrays
//! - FBref: squad stats page HTML (tables plus a text summary)
//! - Backend: the service's camelCase JSON envelopes
//!
//! Extractors skip malformed rows and only fail when the document lacks the
//! container they read from.

use crate::club::ClubIdentity;
use crate::config::ProviderKind;
use crate::error::ExtractionError;
use crate::fallback::FallbackProvider;
use crate::models::{CategoryData, DataCategory};
use crate::retrieval::RawDocument;

// Concrete extractor implementations
pub mod api_football;
pub mod backend;
pub mod fbref;
pub mod registry;

pub use api_football::ApiFootballExtractor;
pub use backend::BackendExtractor;
pub use fbref::FbrefExtractor;
pub use registry::ExtractorRegistry;

/// Age used when a source has none for a player
pub const DEFAULT_PLAYER_AGE: u32 = 25;

/// Turns one provider's documents into normalized records
pub trait DocumentExtractor: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn extract(
        &self,
        doc: &RawDocument,
        category: DataCategory,
    ) -> Result<CategoryData, ExtractionError>;
}

/// What every extractor needs to know about the club
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub club: ClubIdentity,
    pub default_photo: String,
    /// Supplies shirt numbers missing from scraped pages
    pub roster: FallbackProvider,
}

impl ExtractContext {
    pub fn new(club: ClubIdentity, default_photo: &str) -> Self {
        Self {
            club,
            default_photo: default_photo.to_string(),
            roster: FallbackProvider::new(),
        }
    }
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self::new(
            ClubIdentity::default(),
            crate::config::DEFAULT_PLAYER_PHOTO,
        )
    }
}
