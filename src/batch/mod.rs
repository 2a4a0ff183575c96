//! Batch driver: per-item pipeline, failure isolation and the repository
//! boundary.

pub mod engine;
pub mod repository;

pub use engine::{BatchRunner, BatchSummary, ItemFailure, ItemUpdate, PeriodObservation};
pub use repository::{InMemoryRepository, ItemRepository};
