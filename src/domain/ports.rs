use crate::core::query::Filter;
use crate::domain::model::{FieldBag, StoreRecord};
use crate::utils::error::StoreResult;
use async_trait::async_trait;
use std::fmt;

/// Logical tables held by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Chauffeurs,
    Events,
    Availability,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Chauffeurs => "chauffeurs",
            Table::Events => "events",
            Table::Availability => "availability",
        };
        f.write_str(name)
    }
}

/// The generic capability the repository consumes. Implementations return
/// raw records; decoding into domain types happens in `adapters::schema`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, table: Table, filter: &Filter) -> StoreResult<Vec<StoreRecord>>;
    async fn create(&self, table: Table, fields: FieldBag) -> StoreResult<StoreRecord>;
    async fn update(&self, table: Table, id: &str, fields: FieldBag) -> StoreResult<StoreRecord>;
}
