//! Registry of configured sources.

use std::collections::HashMap;
use std::sync::Arc;

use super::{
    arxiv::ArxivSource, crossref::CrossRefSource, openalex::OpenAlexSource,
    semantic::SemanticScholarSource, unpaywall::UnpaywallSource, Source, SourceError,
};
use crate::config::Config;
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        /// Maps reference text (or a known ID) to candidate identifiers
        const RESOLVE = 1 << 0;
        /// Looks up open-access PDF locations by DOI
        const OPEN_ACCESS = 1 << 1;
    }
}

/// Resolver IDs in cascade order; unlisted resolvers run after these, by ID.
pub const RESOLVER_ORDER: [&str; 4] = ["arxiv", "crossref", "openalex", "semantic"];

/// Registry for all configured sources
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard source set from configuration.
    ///
    /// arXiv, Crossref and OpenAlex are always registered. Semantic Scholar
    /// needs an API key and Unpaywall needs a contact email; each is left out
    /// when its credential is missing.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let timeout = config.request_timeout();
        let email = config.unpaywall_email.clone();
        let rows = config.resolution.max_candidates;

        let client = Arc::new(HttpClient::with_contact(email.as_deref(), timeout)?);
        let mut registry = Self::new();

        registry.register(Arc::new(ArxivSource::new(Arc::clone(&client))));
        registry.register(Arc::new(
            CrossRefSource::new(Arc::clone(&client), rows).with_email(email.clone()),
        ));
        registry.register(Arc::new(
            OpenAlexSource::new(Arc::clone(&client), rows).with_email(email.clone()),
        ));

        if let Some(key) = &config.api_keys.semantic_scholar {
            registry.register(Arc::new(SemanticScholarSource::new(
                Arc::clone(&client),
                key.clone(),
                rows,
            )));
        }
        if let Some(email) = email {
            registry.register(Arc::new(UnpaywallSource::new(client, email)));
        }

        Ok(registry)
    }

    /// Register a new source, replacing any source with the same ID
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(id)
    }

    /// Get all registered sources
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// Get sources that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn Source>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    /// Resolvers in the order the cascade should query them
    pub fn resolvers(&self) -> Vec<Arc<dyn Source>> {
        let mut ordered: Vec<Arc<dyn Source>> = RESOLVER_ORDER
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|s| s.supports_resolve())
            .cloned()
            .collect();

        let mut rest: Vec<&Arc<dyn Source>> = self
            .with_capability(SourceCapabilities::RESOLVE)
            .into_iter()
            .filter(|s| !RESOLVER_ORDER.contains(&s.id()))
            .collect();
        rest.sort_by(|a, b| a.id().cmp(b.id()));
        ordered.extend(rest.into_iter().cloned());

        ordered
    }

    /// The open-access lookup source, if one is registered
    pub fn open_access(&self) -> Option<Arc<dyn Source>> {
        let mut sources = self.with_capability(SourceCapabilities::OPEN_ACCESS);
        sources.sort_by(|a, b| a.id().cmp(b.id()));
        sources.first().map(|s| Arc::clone(s))
    }

    /// Check if a source exists
    pub fn has(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    #[test]
    fn test_from_config_without_credentials() {
        let registry = SourceRegistry::from_config(&Config::default()).unwrap();

        assert_eq!(registry.len(), 3);
        for id in ["arxiv", "crossref", "openalex"] {
            assert!(registry.has(id), "Source '{}' should be registered", id);
        }
        assert!(!registry.has("semantic"));
        assert!(registry.open_access().is_none());
    }

    #[test]
    fn test_from_config_with_credentials() {
        let mut config = Config::default();
        config.api_keys.semantic_scholar = Some("key".to_string());
        config.unpaywall_email = Some("me@example.org".to_string());

        let registry = SourceRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.open_access().unwrap().id(), "unpaywall");

        let order: Vec<String> = registry.resolvers().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(order, vec!["arxiv", "crossref", "openalex", "semantic"]);
    }

    #[test]
    fn test_resolver_order_appends_unknown_ids() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(MockSource::new("zeta")));
        registry.register(Arc::new(MockSource::new("openalex")));
        registry.register(Arc::new(MockSource::new("crossref")));
        registry.register(Arc::new(MockSource::new("alpha")));

        let order: Vec<String> = registry.resolvers().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(order, vec!["crossref", "openalex", "alpha", "zeta"]);
    }

    #[test]
    fn test_capabilities() {
        let registry = SourceRegistry::from_config(&Config {
            unpaywall_email: Some("me@example.org".to_string()),
            ..Default::default()
        })
        .unwrap();

        let crossref = registry.get("crossref").unwrap();
        assert!(crossref.supports_resolve());
        assert!(!crossref.supports_open_access());

        let unpaywall = registry.get("unpaywall").unwrap();
        assert!(unpaywall.supports_open_access());
        assert!(!unpaywall.supports_resolve());
        assert_eq!(registry.with_capability(SourceCapabilities::RESOLVE).len(), 3);
    }
}
