pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliArgs, Command};

pub use adapters::{AirtableStore, MemoryStore};
pub use app::{AvailabilityViewModel, EventRow};
pub use config::AppConfig;
pub use crate::core::repository::{AvailabilityRepository, CacheScope, LoadOutcome};
pub use domain::model::{AvailabilityRecord, AvailabilityStatus, Chauffeur, Event, EventStatus};
pub use utils::error::{AvailabilityError, Result, StoreError};
