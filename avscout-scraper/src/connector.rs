//! The contract every data source implements, and the table mapping
//! connector ids to implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use avscout_core::{Classification, Identity, MetadataRecord};
use avscout_lib::{Settings, SourceSettings};

use crate::context::RunContext;
use crate::error::{ConnectorError, ScrapeError};
use crate::json_source::JsonSourceFactory;

/// What a connector is asked to look up.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub identity: Identity,
    /// Spend extra requests on richer fields
    pub hardworking: bool,
}

impl CrawlTarget {
    /// The id to send to the source.
    pub fn id(&self) -> &str {
        self.identity.key()
    }
}

/// A live data source for one site.
#[async_trait]
pub trait Connector: Send + Sync {
    fn site_id(&self) -> &str;

    /// Fill whatever fields the source knows into `record`.
    ///
    /// Filling only some fields is a success. An error means the source
    /// contributed nothing; anything written to `record` before it is discarded.
    async fn crawl_and_fill(
        &self,
        target: &CrawlTarget,
        record: &mut MetadataRecord,
    ) -> Result<(), ConnectorError>;
}

/// Builds a [`Connector`]. Creation may resolve mirrors and may fail.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    fn site_id(&self) -> &str;

    async fn create(&self, ctx: &RunContext) -> Result<Arc<dyn Connector>, ConnectorError>;
}

/// All connectors known to this run, by id.
#[derive(Default)]
pub struct ConnectorRegistry {
    factories: BTreeMap<String, Arc<dyn ConnectorFactory>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding a JSON source for every `[connectors.<id>]` section.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new();
        for (id, connector) in &settings.connectors {
            registry.register(Arc::new(JsonSourceFactory::new(id, connector.clone())));
        }
        registry
    }

    /// Add a factory. A later registration with the same id replaces the earlier one.
    pub fn register(&mut self, factory: Arc<dyn ConnectorFactory>) -> &mut Self {
        let id = factory.site_id().to_string();
        if self.factories.insert(id.clone(), factory).is_some() {
            log::debug!("Connector '{}' registered twice, keeping the last", id);
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn ConnectorFactory>> {
        self.factories.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolve every configured connector list against the registry.
    ///
    /// Unknown ids are reported together, before any movie is processed.
    pub fn plan(&self, sources: &SourceSettings) -> Result<SourcePlan, ScrapeError> {
        let mut lists = BTreeMap::new();
        let mut unknown = Vec::new();

        for classification in Classification::ALL {
            let mut list = Vec::new();
            for id in sources.for_classification(classification) {
                match self.factories.get(id) {
                    Some(factory) => list.push(Arc::clone(factory)),
                    None => unknown.push(format!("{} ({})", id, classification)),
                }
            }
            lists.insert(classification, list);
        }

        if !unknown.is_empty() {
            let known: Vec<&str> = self.ids().collect();
            return Err(ScrapeError::Config(format!(
                "unknown connector id(s): {}; known: [{}]",
                unknown.join(", "),
                known.join(", ")
            )));
        }
        Ok(SourcePlan { lists })
    }
}

/// Ordered connector factories per classification, resolved once at startup.
#[derive(Clone, Default)]
pub struct SourcePlan {
    lists: BTreeMap<Classification, Vec<Arc<dyn ConnectorFactory>>>,
}

impl SourcePlan {
    pub fn for_classification(
        &self,
        classification: Classification,
    ) -> &[Arc<dyn ConnectorFactory>] {
        self.lists
            .get(&classification)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether no classification has any connector.
    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }
}
