use std::collections::HashMap;

use rowsync_proto::{Row, RowId};

/// Ordered, id-unique sequence of rows.
///
/// Order is insertion-relative: new rows go to the front and replaced rows keep their position.
/// Nothing is re-sorted after the fact.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    order: Vec<Row>,
    index: HashMap<RowId, usize>,
}

impl RowSet {
    pub fn new() -> Self { Self::default() }

    /// Seed from a snapshot, keeping its order. A repeated id keeps its first occurrence.
    pub fn from_snapshot(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut set = Self::new();
        for row in rows {
            if !set.index.contains_key(row.id()) {
                set.index.insert(row.id().clone(), set.order.len());
                set.order.push(row);
            }
        }
        set
    }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn contains(&self, id: &RowId) -> bool { self.index.contains_key(id) }

    pub fn get(&self, id: &RowId) -> Option<&Row> { self.index.get(id).map(|&pos| &self.order[pos]) }

    pub fn position(&self, id: &RowId) -> Option<usize> { self.index.get(id).copied() }

    pub fn iter(&self) -> impl Iterator<Item = &Row> { self.order.iter() }

    pub fn ids(&self) -> Vec<RowId> { self.order.iter().map(|row| row.id().clone()).collect() }

    pub fn to_vec(&self) -> Vec<Row> { self.order.clone() }

    /// Insert at the front. Returns false (and changes nothing) if the id is already present.
    pub fn prepend(&mut self, row: Row) -> bool {
        if self.index.contains_key(row.id()) {
            return false;
        }
        self.order.insert(0, row);
        self.fix_from(0);
        true
    }

    /// Replace the row with the same id in place, returning the previous image
    pub fn replace(&mut self, row: Row) -> Option<Row> {
        let pos = *self.index.get(row.id())?;
        Some(std::mem::replace(&mut self.order[pos], row))
    }

    pub fn remove(&mut self, id: &RowId) -> Option<Row> {
        let pos = self.index.remove(id)?;
        let removed = self.order.remove(pos);
        self.fix_from(pos);
        Some(removed)
    }

    // recompute indices for the shifted tail
    fn fix_from(&mut self, start: usize) {
        for (pos, row) in self.order.iter().enumerate().skip(start) {
            self.index.insert(row.id().clone(), pos);
        }
    }
}

impl PartialEq for RowSet {
    fn eq(&self, other: &Self) -> bool { self.order == other.order }
}

impl From<RowSet> for Vec<Row> {
    fn from(set: RowSet) -> Self { set.order }
}
