use std::sync::Arc;

use fnlog_core::error::{FnlogError, Result};
use fnlog_core::ids::LogId;
use fnlog_core::model::log::LogEntry;

use crate::Store;
use crate::db::StoreState;

/// Result of [`Store::add_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInsert {
    /// Ids of the accepted entries, in input order.
    pub ids: Vec<LogId>,
    /// Resident count observed under the same write guard as the inserts.
    pub total: usize,
}

impl Store {
    /// Fails with `InvalidArgument` if an entry with the same id is resident.
    pub fn add(&self, entry: LogEntry) -> Result<LogId> {
        let mut state = self.write();
        state.insert(entry, self.capacity())
    }

    /// Inserts a batch under a single write guard, in order. Entries beyond
    /// capacity evict older ones exactly as repeated [`Store::add`] would.
    /// An entry whose id is already resident is skipped.
    pub fn add_batch(&self, entries: Vec<LogEntry>) -> BatchInsert {
        let capacity = self.capacity();
        let mut state = self.write();
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            match state.insert(entry, capacity) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(error = %e, "skipping log entry"),
            }
        }
        BatchInsert {
            ids,
            total: state.entries.len(),
        }
    }
}

impl StoreState {
    fn insert(&mut self, entry: LogEntry, capacity: usize) -> Result<LogId> {
        let id = entry.id;
        if self.by_id.contains_key(&id) {
            return Err(FnlogError::InvalidArgument(format!(
                "log id {id} is already stored"
            )));
        }

        let entry = Arc::new(entry);
        self.by_function
            .entry(entry.function_name.clone())
            .or_default()
            .push_back(id);
        self.by_id.insert(id, Arc::clone(&entry));
        self.entries.push_back(entry);

        while self.entries.len() > capacity {
            self.evict_oldest();
        }
        Ok(id)
    }
}
