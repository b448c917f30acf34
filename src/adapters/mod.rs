// Adapters layer: concrete record stores and the typed field-bag mapping.

pub mod airtable;
pub mod memory;
pub mod schema;

pub use airtable::AirtableStore;
pub use memory::MemoryStore;
