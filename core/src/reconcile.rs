//! Folding one change event into local cache state.
//!
//! All three functions are pure with respect to the outside world and report the visible change
//! they made, if any. They tolerate duplicate, missing and out-of-order-across-rows delivery:
//! a repeated create is an update, an update for an unknown row inserts it, and a delete for an
//! unknown row does nothing.

use rowsync_proto::{ChangeEvent, Row, RowId};

use crate::{changes::RowChange, predicate::Predicate, rowset::RowSet};

/// Unfiltered table reconciliation
pub fn apply(rows: &mut RowSet, event: ChangeEvent) -> Option<RowChange> {
    match event {
        ChangeEvent::Created(row) | ChangeEvent::Updated(row) => Some(upsert(rows, row)),
        ChangeEvent::Deleted(id) => rows.remove(&id).map(RowChange::Removed),
    }
}

/// Reconciliation against a membership predicate. Every image is re-checked, so a row can enter
/// or leave the set on any update.
pub fn apply_filtered(rows: &mut RowSet, event: ChangeEvent, predicate: &Predicate) -> Option<RowChange> {
    match event {
        ChangeEvent::Created(row) | ChangeEvent::Updated(row) => {
            if predicate.matches(&row) {
                Some(upsert(rows, row))
            } else {
                rows.remove(row.id()).map(RowChange::Removed)
            }
        }
        ChangeEvent::Deleted(id) => rows.remove(&id).map(RowChange::Removed),
    }
}

/// Single-row reconciliation. Events for any id other than `tracked` are ignored.
pub fn apply_record(slot: &mut Option<Row>, tracked: &RowId, event: ChangeEvent) -> Option<RowChange> {
    if event.id() != tracked {
        return None;
    }
    match event {
        ChangeEvent::Created(row) | ChangeEvent::Updated(row) => match slot.replace(row.clone()) {
            Some(_) => Some(RowChange::Updated(row)),
            None => Some(RowChange::Added(row)),
        },
        ChangeEvent::Deleted(_) => slot.take().map(RowChange::Removed),
    }
}

fn upsert(rows: &mut RowSet, row: Row) -> RowChange {
    if rows.replace(row.clone()).is_some() {
        RowChange::Updated(row)
    } else {
        rows.prepend(row.clone());
        RowChange::Added(row)
    }
}
