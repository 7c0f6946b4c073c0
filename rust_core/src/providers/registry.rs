//! Extractor Registry
//!
//! Routes raw documents to the extractor registered for their provider.

use super::{
    ApiFootballExtractor, BackendExtractor, DocumentExtractor, ExtractContext, FbrefExtractor,
};
use crate::config::{DataConfig, ProviderConfig, ProviderKind, ScrapeProviderConfig};
use crate::error::ExtractionError;
use crate::models::{CategoryData, DataCategory};
use crate::retrieval::RawDocument;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of extractors keyed by provider kind
pub struct ExtractorRegistry {
    extractors: HashMap<ProviderKind, Arc<dyn DocumentExtractor>>,
}

impl ExtractorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Create a registry with an extractor for every built-in provider
    pub fn with_defaults(config: &DataConfig) -> Self {
        let ctx = ExtractContext::new(config.club.clone(), &config.default_photo);
        let scrape = config
            .providers
            .iter()
            .find_map(|p| match p {
                ProviderConfig::Scrape(scrape) => Some(scrape.clone()),
                _ => None,
            })
            .unwrap_or_else(ScrapeProviderConfig::default);

        let mut registry = Self::new();
        registry.register(Arc::new(ApiFootballExtractor::new(ctx.clone())));
        registry.register(Arc::new(FbrefExtractor::new(ctx.clone(), &scrape)));
        registry.register(Arc::new(BackendExtractor::new(ctx)));

        info!(
            "ExtractorRegistry initialized with {} extractors",
            registry.extractors.len()
        );
        registry
    }

    /// Register (or replace) the extractor for its provider
    pub fn register(&mut self, extractor: Arc<dyn DocumentExtractor>) {
        debug!("Registering extractor: {}", extractor.provider());
        self.extractors.insert(extractor.provider(), extractor);
    }

    pub fn get(&self, provider: ProviderKind) -> Option<Arc<dyn DocumentExtractor>> {
        self.extractors.get(&provider).cloned()
    }

    /// Extract `category` from `doc` with the matching extractor
    pub fn extract(
        &self,
        doc: &RawDocument,
        category: DataCategory,
    ) -> Result<CategoryData, ExtractionError> {
        let extractor = self
            .extractors
            .get(&doc.provider)
            .ok_or(ExtractionError::NoExtractor(doc.provider))?;

        let data = extractor.extract(doc, category)?;
        debug!(
            "Extracted {} {} records from {}",
            data.record_count(),
            category,
            doc.source_id
        );
        Ok(data)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::DocumentBody;

    #[test]
    fn test_defaults_cover_every_provider() {
        let registry = ExtractorRegistry::with_defaults(&DataConfig::default());
        for kind in [
            ProviderKind::ApiFootball,
            ProviderKind::Fbref,
            ProviderKind::Backend,
        ] {
            assert!(registry.get(kind).is_some(), "missing {}", kind);
        }
    }

    #[test]
    fn test_missing_extractor_is_an_error() {
        let registry = ExtractorRegistry::new();
        let doc = RawDocument {
            provider: ProviderKind::Backend,
            source_id: "backend".to_string(),
            team_id: None,
            body: DocumentBody::Json(serde_json::json!({})),
        };
        assert!(matches!(
            registry.extract(&doc, DataCategory::Squad),
            Err(ExtractionError::NoExtractor(ProviderKind::Backend))
        ));
    }
}
