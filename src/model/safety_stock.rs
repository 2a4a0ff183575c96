// src/model/safety_stock.rs

use serde::{Deserialize, Serialize};

/// How a buyer-entered safety stock interacts with the computed one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideMode {
    /// The manual value is ignored.
    #[default]
    Never,
    /// The smaller of manual and computed wins.
    LesserOf,
    /// The manual value replaces the computed one.
    Always,
}

/// Buyer-entered safety stock, in days of supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub value_days: f64,
    pub mode: OverrideMode,
}

impl ManualOverride {
    pub fn new(value_days: f64, mode: OverrideMode) -> Self {
        Self { value_days, mode }
    }

    /// Resolves the final safety stock (days) from the computed one.
    pub fn apply(&self, computed_days: f64) -> f64 {
        match self.mode {
            OverrideMode::Never => computed_days,
            OverrideMode::LesserOf => self.value_days.min(computed_days),
            OverrideMode::Always => self.value_days,
        }
    }
}

/// Persisted safety-stock state of a single item.
///
/// `safety_stock_units` is always `safety_stock_days * daily_demand` and never
/// negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyStockState {
    pub safety_stock_days: f64,
    pub safety_stock_units: f64,
    pub manual_override: ManualOverride,
    pub service_level_goal: f64,
    /// Fill rate measured by the order workflow, if known.
    pub service_level_attained: Option<f64>,
}
