use std::sync::Arc;

use fnlog_core::error::{FnlogError, Result};
use fnlog_core::ids::LogId;
use fnlog_core::model::log::LogEntry;
use fnlog_core::query::{LogQuery, StoreStats};

use crate::Store;

impl Store {
    pub fn get(&self, id: &LogId) -> Result<LogEntry> {
        self.read()
            .by_id
            .get(id)
            .map(|entry| LogEntry::clone(entry))
            .ok_or_else(|| FnlogError::NotFound(format!("log {id}")))
    }

    /// Newest-first listing, optionally restricted to one function.
    ///
    /// Ordering compares `timestamp` strings lexically. Stored timestamps all
    /// share one fixed-width UTC format, so this is chronological order. Equal
    /// timestamps keep insertion order.
    pub fn query(&self, query: &LogQuery) -> Vec<LogEntry> {
        if query.limit == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<Arc<LogEntry>> = {
            let state = self.read();
            match &query.function_name {
                Some(name) => state
                    .by_function
                    .get(name)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| state.by_id.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default(),
                None => state.entries.iter().cloned().collect(),
            }
        };

        candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        candidates.truncate(query.limit);
        candidates
            .into_iter()
            .map(Arc::unwrap_or_clone)
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.read();
        let mut names: Vec<String> = state.by_function.keys().cloned().collect();
        names.sort();
        StoreStats {
            total_count: state.entries.len(),
            distinct_function_names: names,
        }
    }
}
