pub mod catalog;
pub mod query;
pub mod repository;

pub use crate::domain::model::{AvailabilityRecord, AvailabilityStatus, Chauffeur, Event};
pub use crate::domain::ports::{RecordStore, Table};
pub use crate::utils::error::Result;
