use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fnlog_core::config::DEFAULT_STORE_CAPACITY;
use fnlog_core::error::{FnlogError, Result};
use fnlog_core::ids::LogId;
use fnlog_core::model::log::LogEntry;

/// Capacity-bounded log store.
///
/// The primary sequence and the function-name index live in one
/// [`StoreState`] behind one lock, so an insert and the eviction it triggers
/// are observed together or not at all.
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<StoreState>>,
    capacity: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    /// Insertion order, oldest first.
    pub(crate) entries: VecDeque<Arc<LogEntry>>,
    pub(crate) by_id: HashMap<LogId, Arc<LogEntry>>,
    /// Ids per function name, oldest first. Buckets are never left empty.
    pub(crate) by_function: HashMap<String, VecDeque<LogId>>,
}

impl Store {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FnlogError::InvalidArgument(
                "store capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().expect("store lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().expect("store lock poisoned")
    }

    /// Checks that the sequence, id map and function index agree.
    pub fn verify_consistency(&self) -> Result<()> {
        let state = self.read();
        if state.entries.len() > self.capacity {
            return Err(FnlogError::Internal(format!(
                "{} entries exceed capacity {}",
                state.entries.len(),
                self.capacity
            )));
        }
        if state.by_id.len() != state.entries.len() {
            return Err(FnlogError::Internal(format!(
                "id map holds {} ids for {} entries",
                state.by_id.len(),
                state.entries.len()
            )));
        }

        let mut indexed = HashSet::new();
        for (name, ids) in &state.by_function {
            if ids.is_empty() {
                return Err(FnlogError::Internal(format!("empty bucket for {name}")));
            }
            for id in ids {
                let Some(entry) = state.by_id.get(id) else {
                    return Err(FnlogError::Internal(format!(
                        "bucket {name} references non-resident id {id}"
                    )));
                };
                if &entry.function_name != name {
                    return Err(FnlogError::Internal(format!(
                        "id {id} filed under {name} but belongs to {}",
                        entry.function_name
                    )));
                }
                if !indexed.insert(*id) {
                    return Err(FnlogError::Internal(format!("id {id} indexed twice")));
                }
            }
        }

        for entry in &state.entries {
            if !indexed.contains(&entry.id) {
                return Err(FnlogError::Internal(format!(
                    "entry {} missing from function index",
                    entry.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}
