use std::sync::Arc;

use rowsync_proto::{ChannelFilter, Row};
use serde_json::Value;
use ulid::Ulid;

/// Identity of a predicate. Clones share it; every constructor call mints a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PredicateId(Ulid);

impl std::fmt::Display for PredicateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "P-{}", self.0) }
}

/// Row membership test for a filtered cache.
///
/// Must be pure and stable for the lifetime of a subscription. Caches compare predicates by
/// identity, not by behavior: handing a cache a freshly built predicate rebuilds its subscription
/// even if the closure body is the same.
#[derive(Clone)]
pub struct Predicate {
    id: PredicateId,
    test: Arc<dyn Fn(&Row) -> bool + Send + Sync>,
    filter: Option<ChannelFilter>,
}

impl Predicate {
    pub fn new<F>(test: F) -> Self
    where F: Fn(&Row) -> bool + Send + Sync + 'static {
        Self { id: PredicateId(Ulid::new()), test: Arc::new(test), filter: None }
    }

    /// `row[field] == value`. The equality is also offered to the transport as a filter hint.
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let filter = ChannelFilter::eq(field, value);
        let check = filter.clone();
        Self { id: PredicateId(Ulid::new()), test: Arc::new(move |row| check.matches(row)), filter: Some(filter) }
    }

    pub fn id(&self) -> PredicateId { self.id }

    pub fn matches(&self, row: &Row) -> bool { (self.test)(row) }

    pub fn channel_filter(&self) -> Option<&ChannelFilter> { self.filter.as_ref() }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate").field("id", &self.id).field("filter", &self.filter).finish()
    }
}
