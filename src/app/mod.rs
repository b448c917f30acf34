// Application layer: presentation state built on the repository.

pub mod view_model;

pub use view_model::{AvailabilityViewModel, EventRow};
