use std::{future::Future, sync::Arc};

use rowsync_proto::{ChannelFilter, CollectionId, Row, RowId};
use tracing::debug;

use crate::{config::ClientConfig, datasource::DataSource, error::TransportError};

/// One ordered pull of every current row in a collection. No retries.
pub async fn load_snapshot(
    source: Arc<dyn DataSource>,
    collection: CollectionId,
    filter: Option<ChannelFilter>,
    config: ClientConfig,
) -> Result<Vec<Row>, TransportError> {
    let rows = with_timeout(&config, source.read(&collection, &config.order_by, filter.as_ref())).await?;
    debug!("snapshot of {} returned {} rows", collection, rows.len());
    Ok(rows)
}

/// Single-row variant used by record caches
pub async fn load_record(source: Arc<dyn DataSource>, collection: CollectionId, id: RowId, config: ClientConfig) -> Result<Option<Row>, TransportError> {
    let row = with_timeout(&config, source.read_one(&collection, &id)).await?;
    debug!("snapshot of {}/{} found={}", collection, id, row.is_some());
    Ok(row)
}

async fn with_timeout<T>(config: &ClientConfig, read: impl Future<Output = Result<T, TransportError>>) -> Result<T, TransportError> {
    match config.snapshot_timeout {
        Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| TransportError::Timeout)?,
        None => read.await,
    }
}
