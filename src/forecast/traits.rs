// src/forecast/traits.rs

use std::fmt::Debug;

use crate::model::ForecastState;

/// Level-related fields produced by one smoothing step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelUpdate {
    pub demand_level: f64,
    pub occurrence_probability: f64,
    pub demand_size: f64,
    pub periods_since_demand: u32,
}

/// Defines how a forecast method moves the demand level.
///
/// Implementations only decide the new level; deviation tracking and the
/// tracking signal are shared by every method and live in
/// [`DemandForecaster`](super::DemandForecaster).
pub trait DemandModel: Debug + Send + Sync {
    /// Smooths one period of deseasonalised demand into the level.
    ///
    /// # Arguments
    /// * `state` - The item's state before this period.
    /// * `demand` - Observed demand, already deseasonalised and non-negative.
    /// * `alpha` - Effective smoothing constant as a fraction (0.0 - 1.0).
    fn smooth(&self, state: &ForecastState, demand: f64, alpha: f64) -> LevelUpdate;
}
