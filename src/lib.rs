//! Per-item inventory replenishment engine.
//!
//! Given an item's persisted state and the facts observed in the latest
//! period, the engine produces:
//!
//! - a smoothed demand forecast with MADP and a self-correcting tracking
//!   signal ([`forecast`]),
//! - a lead-time forecast with variance and trend ([`lead_time`]),
//! - a safety-stock buffer sized to a service-level goal ([`safety_stock`]),
//! - a cost-minimising order cycle under vendor bracket discounts
//!   ([`policy`]),
//! - exception records for items needing buyer attention ([`exceptions`]).
//!
//! Every computation is a pure function of its inputs and an immutable
//! [`EngineConfig`]. [`batch::BatchRunner`] drives a whole item population
//! through an [`batch::ItemRepository`], isolating per-item failures.

pub mod batch;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod forecast;
pub mod io;
pub mod lead_time;
pub mod model;
pub mod policy;
pub mod safety_stock;

pub use config::EngineConfig;
pub use error::{ReplenishError, Result};
