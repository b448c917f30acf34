#![allow(dead_code)]

use async_trait::async_trait;
use chauffeur_availability::core::query::Filter;
use chauffeur_availability::domain::model::{FieldBag, StoreRecord};
use chauffeur_availability::domain::ports::{RecordStore, Table};
use chauffeur_availability::utils::error::StoreResult;
use chauffeur_availability::MemoryStore;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;

pub fn availability(id: &str, event: &str, chauffeur: &str, status: &str) -> StoreRecord {
    let fields = serde_json::from_value(json!({
        "Event": [event],
        "Chauffeurs": [chauffeur],
        "Availability": status,
    }))
    .unwrap();
    StoreRecord::new(id, fields)
}

pub fn chauffeur(id: &str, name: &str) -> StoreRecord {
    StoreRecord::new(id, serde_json::from_value(json!({ "Name": name })).unwrap())
}

pub fn event(id: &str, name: &str, day: u32) -> StoreRecord {
    let fields = serde_json::from_value(json!({
        "Event name": name,
        "Starts at": format!("2024-06-{:02}T18:00:00.000Z", day),
        "Stops at": format!("2024-06-{:02}T23:00:00.000Z", day),
        "Location City": "Amsterdam",
        "Travel Time": 3600,
    }))
    .unwrap();
    StoreRecord::new(id, fields)
}

/// Records currently stored for one pair.
pub fn stored_for_pair(store: &MemoryStore, event: &str, chauffeur: &str) -> Vec<StoreRecord> {
    let filter = Filter::for_pair(event, chauffeur);
    store
        .records(Table::Availability)
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect()
}

/// Yields to the scheduler before every call, so concurrent futures in the
/// same task interleave at each store round trip.
#[derive(Default)]
pub struct YieldingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl RecordStore for YieldingStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<StoreRecord>> {
        tokio::task::yield_now().await;
        self.inner.list(table, filter).await
    }

    async fn create(&self, table: Table, fields: FieldBag) -> StoreResult<StoreRecord> {
        tokio::task::yield_now().await;
        self.inner.create(table, fields).await
    }

    async fn update(&self, table: Table, id: &str, fields: FieldBag) -> StoreResult<StoreRecord> {
        tokio::task::yield_now().await;
        self.inner.update(table, id, fields).await
    }
}

/// Holds back list calls matching `gated_list`, and optionally every write,
/// until the matching gate is opened. With `read_before_gate` a gated list
/// reads the store first and only delays the response.
pub struct GatedStore {
    pub inner: MemoryStore,
    gated_list: Option<Filter>,
    read_before_gate: bool,
    pub list_gate: Arc<Notify>,
    gate_writes: bool,
    pub write_gate: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            gated_list: None,
            read_before_gate: false,
            list_gate: Arc::new(Notify::new()),
            gate_writes: false,
            write_gate: Arc::new(Notify::new()),
        }
    }

    pub fn gate_list(mut self, filter: Filter) -> Self {
        self.gated_list = Some(filter);
        self
    }

    pub fn read_before_gate(mut self) -> Self {
        self.read_before_gate = true;
        self
    }

    pub fn gate_writes(mut self) -> Self {
        self.gate_writes = true;
        self
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<StoreRecord>> {
        if self.gated_list.as_ref() != Some(filter) {
            return self.inner.list(table, filter).await;
        }
        if self.read_before_gate {
            let response = self.inner.list(table, filter).await;
            self.list_gate.notified().await;
            return response;
        }
        self.list_gate.notified().await;
        self.inner.list(table, filter).await
    }

    async fn create(&self, table: Table, fields: FieldBag) -> StoreResult<StoreRecord> {
        if self.gate_writes {
            self.write_gate.notified().await;
        }
        self.inner.create(table, fields).await
    }

    async fn update(&self, table: Table, id: &str, fields: FieldBag) -> StoreResult<StoreRecord> {
        if self.gate_writes {
            self.write_gate.notified().await;
        }
        self.inner.update(table, id, fields).await
    }
}
