use std::sync::Arc;

use rowsync_proto::{CollectionId, RowId};

use crate::{config::ClientConfig, datasource::DataSource, filtered::FilteredCache, predicate::Predicate, record::RecordCache, table::TableCache};

/// Entry point for creating caches against one data source.
///
/// Create one at application start and clone it wherever caches are needed. Every `subscribe_*`
/// call builds an independent cache with its own snapshot read and change channel.
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct Client {
    source: Arc<dyn DataSource>,
    config: ClientConfig,
}

impl Client {
    pub fn new(source: Arc<dyn DataSource>) -> Self { Self::with_config(source, ClientConfig::default()) }

    pub fn with_config(source: Arc<dyn DataSource>, config: ClientConfig) -> Self { Self { source, config } }

    pub fn config(&self) -> &ClientConfig { &self.config }

    pub fn source(&self) -> &Arc<dyn DataSource> { &self.source }

    pub fn subscribe_table(&self, collection: impl Into<CollectionId>) -> TableCache {
        TableCache::new(self.source.clone(), collection, self.config.clone())
    }

    pub fn subscribe_filtered(&self, collection: impl Into<CollectionId>, predicate: Predicate) -> FilteredCache {
        FilteredCache::new(self.source.clone(), collection, predicate, self.config.clone())
    }

    pub fn subscribe_record(&self, collection: impl Into<CollectionId>, id: Option<RowId>) -> RecordCache {
        RecordCache::new(self.source.clone(), collection, id, self.config.clone())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Client").field("config", &self.config).finish() }
}
