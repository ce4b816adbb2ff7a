//! # rowsync
//!
//! Keeps an in-memory copy of a remote table (or a filtered slice of it, or a single row)
//! current. Each cache loads an ordered snapshot once and then folds in row-level change events
//! from a push channel, tolerating duplicate and out-of-order delivery.
//!
//! ## Core Concepts
//!
//! - **Data source**: the remote store's read API plus its change feed, supplied by the application
//! - **Table cache**: every row of a collection
//! - **Filtered cache**: the rows that satisfy a predicate, re-checked on every change
//! - **Record cache**: one row by id, switchable at any time
//! - **Change set**: what one reconciliation step did, delivered to subscribers
//!
//! ## Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use rowsync::{Client, Predicate, Row};
//! # use rowsync_connector_memory::MemoryDataSource;
//! # use serde_json::json;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let remote = MemoryDataSource::new();
//!     remote.insert("tasks", Row::new(json!({"id": 1, "title": "write docs", "status": "active"}))?);
//!
//!     let client = Client::new(Arc::new(remote.clone()));
//!     let active = client.subscribe_filtered("tasks", Predicate::field_eq("status", "active"));
//!     active.wait_loaded().await;
//!     assert_eq!(active.value().len(), 1);
//!
//!     active.dispose();
//!     Ok(())
//! # }
//! ```
//!
//! Caches never return errors. A failed snapshot leaves the cache empty with loading cleared,
//! and the failure is reported through `last_error()` and the diagnostics stream.

pub use rowsync_core as core;
pub use rowsync_proto as proto;
pub use rowsync_signals as signals;

#[cfg(feature = "memory")]
pub use rowsync_connector_memory as memory;

pub use rowsync_core::{
    accessors, changes,
    changes::{ChangeKind, ChangeSet, RowChange},
    client::Client,
    config::ClientConfig,
    datasource::{ChangeFeed, ChannelHandle, DataSource, EventSink, RemoteRead},
    error,
    error::{ChannelError, Diagnostic, TransportError},
    filtered::FilteredCache,
    predicate::Predicate,
    record::{RecordCache, RecordState},
    table::TableCache,
};
pub use rowsync_proto::{ChangeEvent, ChannelFilter, CollectionId, OrderBy, Row, RowId, WireEvent};
pub use rowsync_signals::{Peek, Signal, Subscribe, SubscriptionGuard};
