// src/forecast/avs.rs

use crate::forecast::traits::{DemandModel, LevelUpdate};
use crate::model::{ForecastMethod, ForecastState};

fn periods_since_demand(state: &ForecastState, demand: f64) -> u32 {
    if demand > 0.0 {
        0
    } else {
        state.periods_since_demand.saturating_add(1)
    }
}

// =========================================================================
// 1. Regular AVS
// =========================================================================

/// Single-series exponential smoothing of the demand level.
///
/// Formula: Level' = Level + alpha * (Demand - Level)
#[derive(Debug, Clone, Copy, Default)]
pub struct RegularAvs;

impl DemandModel for RegularAvs {
    fn smooth(&self, state: &ForecastState, demand: f64, alpha: f64) -> LevelUpdate {
        let level = state.demand_level + alpha * (demand - state.demand_level);
        let level = level.max(0.0);

        LevelUpdate {
            demand_level: level,
            occurrence_probability: state.occurrence_probability,
            demand_size: level,
            periods_since_demand: periods_since_demand(state, demand),
        }
    }
}

// =========================================================================
// 2. Enhanced AVS (intermittent demand)
// =========================================================================

/// Smooths the chance of any demand and the size of demand when it occurs
/// as two separate series.
///
/// The size only moves in periods that see demand, so a run of empty
/// periods lowers the level through the occurrence probability alone.
/// Formula: Level' = P(demand)' * Size'
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancedAvs;

impl DemandModel for EnhancedAvs {
    fn smooth(&self, state: &ForecastState, demand: f64, alpha: f64) -> LevelUpdate {
        let occurred = if demand > 0.0 { 1.0 } else { 0.0 };
        let probability = state.occurrence_probability
            + alpha * (occurred - state.occurrence_probability);
        let probability = probability.clamp(0.0, 1.0);

        let size = if demand > 0.0 {
            if state.demand_size > 0.0 {
                state.demand_size + alpha * (demand - state.demand_size)
            } else {
                // First demand ever seen seeds the size directly
                demand
            }
        } else {
            state.demand_size
        };

        LevelUpdate {
            demand_level: probability * size,
            occurrence_probability: probability,
            demand_size: size,
            periods_since_demand: periods_since_demand(state, demand),
        }
    }
}

impl ForecastMethod {
    /// The smoothing model behind this method.
    pub fn model(self) -> Box<dyn DemandModel> {
        match self {
            ForecastMethod::RegularAvs => Box::new(RegularAvs),
            ForecastMethod::EnhancedAvs => Box::new(EnhancedAvs),
        }
    }
}
