//! Per-table change tracking for live queries.
//!
//! # Invariants
//! - Versions only grow; a version bump means "re-read this table".
//! - The latest versions are always observable, even by late subscribers.

use tokio::sync::watch;

/// Tables that writes can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Tasks,
    Categories,
}

/// Monotonic write counters, one per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableVersions {
    pub tasks: u64,
    pub categories: u64,
}

impl TableVersions {
    pub fn get(&self, table: Table) -> u64 {
        match table {
            Table::Tasks => self.tasks,
            Table::Categories => self.categories,
        }
    }

    /// Returns whether any of `tables` moved past the `earlier` snapshot.
    pub fn changed_since(&self, earlier: &TableVersions, tables: &[Table]) -> bool {
        tables
            .iter()
            .any(|table| self.get(*table) != earlier.get(*table))
    }

    fn bump(&mut self, table: Table) {
        match table {
            Table::Tasks => self.tasks += 1,
            Table::Categories => self.categories += 1,
        }
    }
}

pub(crate) struct InvalidationTracker {
    tx: watch::Sender<TableVersions>,
}

impl InvalidationTracker {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(TableVersions::default());
        Self { tx }
    }

    pub(crate) fn invalidate(&self, table: Table) {
        self.tx.send_modify(|versions| versions.bump(table));
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<TableVersions> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> TableVersions {
        *self.tx.borrow()
    }
}
