// src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::{ReplenishError, Result};

/// Company-wide settings for one batch run.
///
/// Loaded once per run and passed by reference into every computation; nothing
/// in the engine mutates it mid-run. Missing TOML keys fall back to the
/// [`Default`] values below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Company service-level goal (%), used when neither item nor vendor sets one.
    pub service_level_goal: Option<f64>,
    /// Absolute tracking signal beyond which a breach is reported.
    pub tracking_signal_limit: f64,
    /// Demand spike threshold, as a multiple of the mean absolute deviation.
    pub forecast_demand_limit: f64,
    /// Cap (%) on the empirical safety-stock adjustment.
    pub max_adjustment_pct: f64,
    /// Percentage points below goal tolerated before a service-level breach.
    pub service_level_tolerance: f64,
    /// Lead-time variance (%) beyond which a breach is reported.
    pub lead_time_variance_ceiling: f64,

    // Demand forecasting
    pub default_alpha_factor: f64,
    pub tracking_alpha_boost: f64,
    pub min_demand_denominator: f64,
    pub max_madp: f64,

    // Lead time
    pub lead_time_alpha_factor: f64,
    pub initial_lead_time_variance: f64,
    pub lead_time_trend_threshold_pct: f64,

    // Safety stock
    pub madp_std_dev_factor: f64,
    pub cycle_dampening_slope: f64,
    pub cycle_dampening_floor: f64,
    pub apply_expost_adjustment: bool,

    // Order policy
    pub carrying_cost_rate: f64,
    pub min_cycle_days: u32,
    pub max_cycle_days: u32,
    pub cycle_step_days: u32,
    pub days_per_year: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_level_goal: None,
            tracking_signal_limit: 0.55,
            forecast_demand_limit: 3.0,
            max_adjustment_pct: 10.0,
            service_level_tolerance: 5.0,
            lead_time_variance_ceiling: 30.0,
            default_alpha_factor: 10.0,
            tracking_alpha_boost: 2.0,
            min_demand_denominator: 0.001,
            max_madp: 100.0,
            lead_time_alpha_factor: 20.0,
            initial_lead_time_variance: 10.0,
            lead_time_trend_threshold_pct: 1.0,
            madp_std_dev_factor: 1.25,
            cycle_dampening_slope: 0.1,
            cycle_dampening_floor: 0.5,
            apply_expost_adjustment: true,
            carrying_cost_rate: 0.40,
            min_cycle_days: 7,
            max_cycle_days: 90,
            cycle_step_days: 1,
            days_per_year: 365.0,
        }
    }
}

impl EngineConfig {
    /// Sets the company service-level goal.
    pub fn with_service_level_goal(mut self, goal: f64) -> Self {
        self.service_level_goal = Some(goal);
        self
    }

    /// Validates this configuration.
    ///
    /// Every threshold must be finite and positive, smoothing constants must
    /// lie in 0–100, the cycle grid must be non-empty and the dampening floor
    /// must lie in (0, 1].
    pub fn validate(&self) -> Result<()> {
        if let Some(goal) = self.service_level_goal {
            if !goal.is_finite() || goal <= 0.0 || goal >= 100.0 {
                return Err(invalid(format!(
                    "service_level_goal must be in (0, 100), got {goal}"
                )));
            }
        }

        let positive = [
            ("tracking_signal_limit", self.tracking_signal_limit),
            ("forecast_demand_limit", self.forecast_demand_limit),
            ("tracking_alpha_boost", self.tracking_alpha_boost),
            ("min_demand_denominator", self.min_demand_denominator),
            ("max_madp", self.max_madp),
            ("lead_time_variance_ceiling", self.lead_time_variance_ceiling),
            ("madp_std_dev_factor", self.madp_std_dev_factor),
            ("days_per_year", self.days_per_year),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("max_adjustment_pct", self.max_adjustment_pct),
            ("service_level_tolerance", self.service_level_tolerance),
            ("initial_lead_time_variance", self.initial_lead_time_variance),
            ("lead_time_trend_threshold_pct", self.lead_time_trend_threshold_pct),
            ("cycle_dampening_slope", self.cycle_dampening_slope),
            ("carrying_cost_rate", self.carrying_cost_rate),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        for (name, alpha) in [
            ("default_alpha_factor", self.default_alpha_factor),
            ("lead_time_alpha_factor", self.lead_time_alpha_factor),
        ] {
            if !(0.0..=100.0).contains(&alpha) {
                return Err(invalid(format!("{name} must be in 0..=100, got {alpha}")));
            }
        }

        if !(self.cycle_dampening_floor > 0.0 && self.cycle_dampening_floor <= 1.0) {
            return Err(invalid(format!(
                "cycle_dampening_floor must be in (0, 1], got {}",
                self.cycle_dampening_floor
            )));
        }

        if self.min_cycle_days == 0
            || self.cycle_step_days == 0
            || self.min_cycle_days > self.max_cycle_days
        {
            return Err(invalid(format!(
                "cycle grid {}..={} step {} is empty",
                self.min_cycle_days, self.max_cycle_days, self.cycle_step_days
            )));
        }

        Ok(())
    }
}

fn invalid(reason: String) -> ReplenishError {
    ReplenishError::Validation { reason }
}
