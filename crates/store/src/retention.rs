use fnlog_core::ids::LogId;

use crate::db::StoreState;

impl StoreState {
    /// Drops the oldest-inserted entry from the sequence, the id map and its
    /// function bucket.
    ///
    /// # Panics
    ///
    /// Panics if the entry is missing from its function bucket. That means the
    /// sequence and index have diverged, which no sequence of public calls can
    /// produce.
    pub(crate) fn evict_oldest(&mut self) -> Option<LogId> {
        let evicted = self.entries.pop_front()?;
        let id = evicted.id;
        self.by_id.remove(&id);

        let name = &evicted.function_name;
        let Some(bucket) = self.by_function.get_mut(name) else {
            panic!("store index out of sync: no bucket {name:?} for evicted id {id}");
        };
        // Buckets share the sequence's FIFO order, so the id is normally first.
        let position = if bucket.front() == Some(&id) {
            Some(0)
        } else {
            bucket.iter().position(|candidate| *candidate == id)
        };
        let Some(position) = position else {
            panic!("store index out of sync: evicted id {id} not in bucket {name:?}");
        };
        bucket.remove(position);
        if bucket.is_empty() {
            self.by_function.remove(name);
        }

        tracing::trace!(%id, function_name = %name, "evicted oldest log entry");
        Some(id)
    }
}
