pub mod accessors;
mod cache;
pub mod changes;
pub mod client;
pub mod config;
pub mod datasource;
pub mod error;
pub mod filtered;
pub mod predicate;
pub mod reconcile;
pub mod record;
pub mod rowset;
pub mod snapshot;
pub mod startup;
mod subscription;
pub mod table;
pub mod task;

pub use changes::{ChangeKind, ChangeSet, RowChange};
pub use client::Client;
pub use config::ClientConfig;
pub use datasource::{ChangeFeed, ChannelHandle, DataSource, EventSink, RemoteRead};
pub use error::{ChannelError, Diagnostic, TransportError};
pub use filtered::FilteredCache;
pub use predicate::{Predicate, PredicateId};
pub use record::{RecordCache, RecordState};
pub use table::TableCache;

pub use rowsync_proto as proto;
pub use rowsync_signals as signals;
