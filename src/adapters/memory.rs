use crate::core::query::Filter;
use crate::domain::model::{FieldBag, StoreRecord};
use crate::domain::ports::{RecordStore, Table};
use crate::utils::error::{StoreError, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub lists: usize,
    pub creates: usize,
    pub updates: usize,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Table, Vec<StoreRecord>>,
    next_id: u64,
    calls: CallCounts,
    fail_reads: bool,
    fail_writes: bool,
}

/// An in-process record store. Like the real one it has no uniqueness
/// constraint, and it counts calls so callers can assert on traffic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record as-is, bypassing the call counters.
    pub fn seed(&self, table: Table, record: StoreRecord) {
        self.inner.lock().tables.entry(table).or_default().push(record);
    }

    pub fn records(&self, table: Table) -> Vec<StoreRecord> {
        self.inner
            .lock()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> CallCounts {
        self.inner.lock().calls
    }

    pub fn reset_calls(&self) {
        self.inner.lock().calls = CallCounts::default();
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<StoreRecord>> {
        let mut inner = self.inner.lock();
        inner.calls.lists += 1;
        if inner.fail_reads {
            return Err(StoreError::Unavailable {
                message: format!("reads from {} are failing", table),
            });
        }
        Ok(inner
            .tables
            .get(&table)
            .map(|records| records.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, table: Table, fields: FieldBag) -> StoreResult<StoreRecord> {
        let mut inner = self.inner.lock();
        inner.calls.creates += 1;
        if inner.fail_writes {
            return Err(StoreError::Unavailable {
                message: format!("writes to {} are failing", table),
            });
        }
        inner.next_id += 1;
        let record = StoreRecord::new(format!("rec{:06}", inner.next_id), fields);
        inner.tables.entry(table).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: Table, id: &str, fields: FieldBag) -> StoreResult<StoreRecord> {
        let mut inner = self.inner.lock();
        inner.calls.updates += 1;
        if inner.fail_writes {
            return Err(StoreError::Unavailable {
                message: format!("writes to {} are failing", table),
            });
        }
        let record = inner
            .tables
            .get_mut(&table)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        // PATCH semantics: only the given fields change.
        record.fields.extend(fields);
        Ok(record.clone())
    }
}
