use rowsync_proto::{Row, RowId, SubscriptionId};

/// How one row's presence in a cache changed
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    /// Part of the snapshot a subscription was seeded with
    Initial(Row),
    /// Newly visible: created remotely, healed from an update, or now passing the predicate
    Added(Row),
    /// Still visible with a new image
    Updated(Row),
    /// No longer visible: deleted remotely or no longer passing the predicate. Carries the last known image.
    Removed(Row),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Initial,
    Add,
    Update,
    Remove,
}

impl RowChange {
    pub fn row(&self) -> &Row {
        match self {
            RowChange::Initial(row) | RowChange::Added(row) | RowChange::Updated(row) | RowChange::Removed(row) => row,
        }
    }

    pub fn id(&self) -> &RowId { self.row().id() }

    pub fn kind(&self) -> ChangeKind {
        match self {
            RowChange::Initial(_) => ChangeKind::Initial,
            RowChange::Added(_) => ChangeKind::Add,
            RowChange::Updated(_) => ChangeKind::Update,
            RowChange::Removed(_) => ChangeKind::Remove,
        }
    }
}

impl From<&RowChange> for ChangeKind {
    fn from(change: &RowChange) -> Self { change.kind() }
}

/// Everything one reconciliation step changed in a cache
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub subscription: SubscriptionId,
    pub changes: Vec<RowChange>,
    /// Set on the change set produced when the snapshot resolves (successfully or not)
    pub initial: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool { self.changes.is_empty() }

    pub fn summary(&self) -> Vec<(RowId, ChangeKind)> { self.changes.iter().map(|c| (c.id().clone(), c.kind())).collect() }
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let changes = self.changes.iter().map(|c| format!("{:?} {}", c.kind(), c.id())).collect::<Vec<_>>().join(", ");
        write!(f, "ChangeSet({} [{}])", self.subscription, changes)
    }
}
