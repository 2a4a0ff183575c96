//! Safety-stock sizing from a service-level goal.
//!
//! Safety stock is expressed in days of supply. The buffer covers demand
//! variability over the lead time and the variability of the lead time
//! itself:
//!
//! ```text
//! SS = Z * sqrt(LT * sigma_D^2 + D^2 * sigma_LT)
//! ```
//!
//! Where:
//! - Z = standard normal quantile of the service-level goal
//! - sigma_D = MADP scaled to a standard deviation (`madp_std_dev_factor`)
//! - sigma_LT = lead time * lead-time variance
//! - D = daily demand, which is 1.0 on a days-of-supply basis
//!
//! Conversion to units happens afterwards with [`safety_stock_units`].

use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ensure_non_negative, ensure_positive, ReplenishError, Result};
use crate::model::{ManualOverride, SafetyStockState};

/// Standard normal distribution used for quantiles and probabilities.
fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0)
        .map_err(|e| ReplenishError::computation(format!("standard normal unavailable: {e}")))
}

/// Converts a service level (%) to a standard normal quantile.
///
/// The goal must lie strictly between 0 and 100; both ends map to infinite
/// quantiles.
pub fn z_score(service_level_goal: f64) -> Result<f64> {
    if !service_level_goal.is_finite() || service_level_goal <= 0.0 || service_level_goal >= 100.0 {
        return Err(ReplenishError::validation(format!(
            "service level goal must be in (0, 100), got {service_level_goal}"
        )));
    }
    Ok(standard_normal()?.inverse_cdf(service_level_goal / 100.0))
}

/// Units held for a days-of-supply safety stock. Never negative.
pub fn safety_stock_units(safety_stock_days: f64, daily_demand: f64) -> f64 {
    (safety_stock_days * daily_demand).max(0.0)
}

/// Daily demand rate of a per-period demand level.
pub fn daily_demand_rate(demand_level: f64, periodicity: u16, days_per_year: f64) -> f64 {
    demand_level * f64::from(periodicity) / days_per_year
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyStockCalculator<'a> {
    config: &'a EngineConfig,
}

impl<'a> SafetyStockCalculator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Picks the service-level goal: item, then vendor, then company.
    ///
    /// Fails with `ConfigurationMissing` when none of them is set.
    pub fn resolve_goal(&self, item_goal: Option<f64>, vendor_goal: Option<f64>) -> Result<f64> {
        item_goal
            .or(vendor_goal)
            .or(self.config.service_level_goal)
            .ok_or_else(|| ReplenishError::missing("service level goal"))
    }

    /// Dampening applied for longer review cycles.
    ///
    /// `1 - slope * log10(cycle)`, kept within `[floor, 1]`.
    pub fn cycle_factor(&self, order_cycle_days: f64) -> f64 {
        let factor = 1.0 - self.config.cycle_dampening_slope * order_cycle_days.log10();
        factor.clamp(self.config.cycle_dampening_floor, 1.0)
    }

    /// Standard deviation of lead-time demand in days of supply.
    fn combined_deviation(&self, madp: f64, lead_time: f64, lead_time_variance: f64) -> f64 {
        let std_dev = madp / 100.0 * self.config.madp_std_dev_factor;
        let lt_variance_days = lead_time * (lead_time_variance / 100.0);
        let daily_demand: f64 = 1.0;

        ((lead_time * std_dev.powi(2)) + (daily_demand.powi(2) * lt_variance_days)).sqrt()
    }

    /// Calculates safety stock in days of supply.
    ///
    /// # Arguments
    /// * `service_level_goal` - Target service level in percent, in (0, 100).
    /// * `madp` - Mean absolute deviation percentage of demand.
    /// * `lead_time` - Lead time in days.
    /// * `lead_time_variance` - Lead-time variance in percent.
    /// * `order_cycle_days` - Review cycle; longer cycles dampen the result.
    ///
    /// # Returns
    /// Safety stock in days, never negative. Goals below 50% give a negative
    /// quantile and therefore zero.
    pub fn compute(
        &self,
        service_level_goal: f64,
        madp: f64,
        lead_time: f64,
        lead_time_variance: f64,
        order_cycle_days: Option<f64>,
    ) -> Result<f64> {
        ensure_non_negative("madp", madp)?;
        ensure_positive("lead time", lead_time)?;
        ensure_non_negative("lead time variance", lead_time_variance)?;
        let z = z_score(service_level_goal)?;

        let mut days = z * self.combined_deviation(madp, lead_time, lead_time_variance);

        if let Some(cycle) = order_cycle_days {
            ensure_positive("order cycle", cycle)?;
            days *= self.cycle_factor(cycle);
        }

        if !days.is_finite() {
            return Err(ReplenishError::computation(format!(
                "safety stock is not finite (z = {z})"
            )));
        }

        debug!(z, days, "safety stock computed");
        Ok(days.max(0.0))
    }

    /// Service level (%) achieved by holding `safety_stock_days`.
    ///
    /// Without any variability every non-negative buffer achieves 100%.
    pub fn calculate_service_level(
        &self,
        safety_stock_days: f64,
        madp: f64,
        lead_time: f64,
        lead_time_variance: f64,
    ) -> Result<f64> {
        ensure_non_negative("safety stock days", safety_stock_days)?;
        ensure_non_negative("madp", madp)?;
        ensure_positive("lead time", lead_time)?;
        ensure_non_negative("lead time variance", lead_time_variance)?;

        let deviation = self.combined_deviation(madp, lead_time, lead_time_variance);
        if deviation == 0.0 {
            return Ok(100.0);
        }
        let level = standard_normal()?.cdf(safety_stock_days / deviation) * 100.0;
        Ok(level.min(100.0))
    }

    /// Corrects safety stock from the service level actually attained.
    ///
    /// The gap between goal and attained (in percentage points) becomes a
    /// relative adjustment capped at `max_adjustment_pct`: shortfalls grow
    /// the buffer, excess shrinks it.
    pub fn adjust_expost(
        &self,
        current_ss_days: f64,
        service_level_goal: f64,
        service_level_attained: f64,
        max_adjustment_pct: f64,
    ) -> Result<f64> {
        ensure_non_negative("current safety stock", current_ss_days)?;
        ensure_non_negative("max adjustment", max_adjustment_pct)?;
        for (name, level) in [
            ("service level goal", service_level_goal),
            ("service level attained", service_level_attained),
        ] {
            if !(0.0..=100.0).contains(&level) {
                return Err(ReplenishError::validation(format!(
                    "{name} must be in 0..=100, got {level}"
                )));
            }
        }

        let cap = max_adjustment_pct / 100.0;
        let factor = ((service_level_goal - service_level_attained) / 100.0).clamp(-cap, cap);
        Ok((current_ss_days * (1.0 + factor)).max(0.0))
    }

    /// Assembles the persisted state from a computed buffer.
    ///
    /// The manual override is applied last; units follow the final days.
    pub fn finalize(
        &self,
        computed_days: f64,
        daily_demand: f64,
        manual_override: ManualOverride,
        service_level_goal: f64,
        service_level_attained: Option<f64>,
    ) -> SafetyStockState {
        let days = manual_override.apply(computed_days).max(0.0);
        SafetyStockState {
            safety_stock_days: days,
            safety_stock_units: safety_stock_units(days, daily_demand),
            manual_override,
            service_level_goal,
            service_level_attained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OverrideMode;

    #[test]
    fn z_at_95_percent() {
        assert!((z_score(95.0).unwrap() - 1.644_853_6).abs() < 1e-6);
        assert!(z_score(50.0).unwrap().abs() < 1e-9);
        assert!(z_score(0.0).is_err());
        assert!(z_score(100.0).is_err());
    }

    #[test]
    fn reference_scenario() {
        let cfg = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&cfg);
        let ss = calc.compute(95.0, 20.0, 10.0, 15.0, None).unwrap();
        // 1.6449 * sqrt(10 * 0.25^2 + 1.5)
        let expected = 1.644_853_6 * (2.125f64).sqrt();
        assert!((ss - expected).abs() < 1e-5);
    }

    #[test]
    fn cycle_dampening_bounds() {
        let cfg = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&cfg);
        assert!((calc.cycle_factor(1.0) - 1.0).abs() < 1e-12);
        assert!((calc.cycle_factor(10.0) - 0.9).abs() < 1e-12);
        assert!((calc.cycle_factor(1e9) - 0.5).abs() < 1e-12);
        // cycles under a day would push the factor above 1
        assert!((calc.cycle_factor(0.1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn low_goal_floors_at_zero() {
        let cfg = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&cfg);
        assert_eq!(calc.compute(30.0, 20.0, 10.0, 15.0, Some(14.0)).unwrap(), 0.0);
    }

    #[test]
    fn zero_variability_gives_zero_buffer() {
        let cfg = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&cfg);
        assert_eq!(calc.compute(99.0, 0.0, 10.0, 0.0, None).unwrap(), 0.0);
        assert_eq!(calc.calculate_service_level(0.0, 0.0, 10.0, 0.0).unwrap(), 100.0);
    }

    #[test]
    fn goal_resolution_order() {
        let cfg = EngineConfig::default().with_service_level_goal(90.0);
        let calc = SafetyStockCalculator::new(&cfg);
        assert_eq!(calc.resolve_goal(Some(99.0), Some(95.0)).unwrap(), 99.0);
        assert_eq!(calc.resolve_goal(None, Some(95.0)).unwrap(), 95.0);
        assert_eq!(calc.resolve_goal(None, None).unwrap(), 90.0);

        let bare = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&bare);
        assert!(matches!(
            calc.resolve_goal(None, None),
            Err(ReplenishError::ConfigurationMissing { .. })
        ));
    }

    #[test]
    fn expost_direction() {
        let cfg = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&cfg);
        // 3 points short: grow by 3%
        let up = calc.adjust_expost(10.0, 95.0, 92.0, 10.0).unwrap();
        assert!((up - 10.3).abs() < 1e-12);
        // 4 points over: shrink by 4%
        let down = calc.adjust_expost(10.0, 95.0, 99.0, 10.0).unwrap();
        assert!((down - 9.6).abs() < 1e-12);
        assert!(calc.adjust_expost(10.0, 95.0, 120.0, 10.0).is_err());
    }

    #[test]
    fn finalize_applies_override_and_units() {
        let cfg = EngineConfig::default();
        let calc = SafetyStockCalculator::new(&cfg);
        let s = calc.finalize(
            6.0,
            2.5,
            ManualOverride::new(4.0, OverrideMode::LesserOf),
            95.0,
            None,
        );
        assert_eq!(s.safety_stock_days, 4.0);
        assert!((s.safety_stock_units - 10.0).abs() < 1e-12);
    }

    #[test]
    fn daily_rate_from_weekly_level() {
        assert!((daily_demand_rate(70.0, 52, 364.0) - 10.0).abs() < 1e-12);
        assert_eq!(safety_stock_units(-1.0, 5.0), 0.0);
    }
}
