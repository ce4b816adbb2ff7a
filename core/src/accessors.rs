//! Named cache shapes for common application needs. Each is only a parameterization of a
//! filtered or record cache.

use rowsync_proto::{CollectionId, RowId};
use serde_json::Value;

use crate::{client::Client, filtered::FilteredCache, predicate::Predicate, record::RecordCache};

pub const USER_ID_FIELD: &str = "user_id";
pub const STATUS_FIELD: &str = "status";

/// Rows owned by one user
pub fn owned_rows(client: &Client, collection: impl Into<CollectionId>, user_id: impl Into<Value>) -> FilteredCache {
    client.subscribe_filtered(collection, Predicate::field_eq(USER_ID_FIELD, user_id))
}

pub fn rows_with_status(client: &Client, collection: impl Into<CollectionId>, status: impl Into<Value>) -> FilteredCache {
    client.subscribe_filtered(collection, Predicate::field_eq(STATUS_FIELD, status))
}

/// A single row by id
pub fn record(client: &Client, collection: impl Into<CollectionId>, id: impl Into<RowId>) -> RecordCache {
    client.subscribe_record(collection, Some(id.into()))
}
