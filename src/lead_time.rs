//! Lead-time forecasting from observed receipts.
//!
//! Uses the same smoothing structure as demand: the forecast follows each
//! receipt by the lead-time smoothing constant, the variance is the smoothed
//! absolute deviation as a percentage of the forecast, and the trend
//! indicator smooths the first difference of successive forecasts.

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ensure_positive, ReplenishError, Result};
use crate::forecast::weighted_recent_average;
use crate::model::LeadTimeState;

#[derive(Debug, Clone, Copy)]
pub struct LeadTimeForecaster<'a> {
    config: &'a EngineConfig,
}

impl<'a> LeadTimeForecaster<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Folds one observed lead time (days) into `state`.
    ///
    /// Zero, negative and non-finite observations are rejected.
    pub fn update(
        &self,
        state: &LeadTimeState,
        observed_lead_time_days: f64,
    ) -> Result<LeadTimeState> {
        ensure_positive("observed lead time", observed_lead_time_days)?;
        state.validate()?;

        let alpha = self.config.lead_time_alpha_factor / 100.0;
        let previous = state.lead_time_forecast;

        let deviation_pct = (observed_lead_time_days - previous).abs() / previous * 100.0;
        let variance = (state.lead_time_variance
            + alpha * (deviation_pct - state.lead_time_variance))
            .max(0.0);

        // Convex combination of two positive values stays positive
        let forecast = previous + alpha * (observed_lead_time_days - previous);
        let trend = state.trend_indicator + alpha * ((forecast - previous) - state.trend_indicator);

        debug!(
            observed = observed_lead_time_days,
            forecast, variance, trend, "lead time updated"
        );

        Ok(LeadTimeState {
            lead_time_forecast: forecast,
            lead_time_variance: variance,
            trend_indicator: trend,
            observations: state.observations.saturating_add(1),
        })
    }

    /// State for an item's first receipt.
    pub fn initial_state(&self, observed_lead_time_days: f64) -> Result<LeadTimeState> {
        ensure_positive("observed lead time", observed_lead_time_days)?;
        let mut state =
            LeadTimeState::new(observed_lead_time_days, self.config.initial_lead_time_variance);
        state.observations = 1;
        Ok(state)
    }

    /// Seeds a state from receipt history, most recent receipt first.
    ///
    /// The forecast is an exponentially weighted average and the variance
    /// the coefficient of variation in percent (the configured initial
    /// variance when fewer than two receipts exist).
    pub fn seed_from_history(&self, history: &[f64]) -> Result<LeadTimeState> {
        if history.is_empty() {
            return Err(ReplenishError::validation("lead-time history is empty"));
        }
        for v in history {
            ensure_positive("lead-time history value", *v)?;
        }

        let forecast = weighted_recent_average(history);
        let variance = if history.len() < 2 {
            self.config.initial_lead_time_variance
        } else {
            let n = history.len() as f64;
            let mean = history.iter().sum::<f64>() / n;
            let var = history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            var.sqrt() / mean * 100.0
        };

        let mut state = LeadTimeState::new(forecast, variance);
        state.observations = history.len() as u32;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrendDirection;

    #[test]
    fn smoothing_step() {
        let cfg = EngineConfig::default();
        let f = LeadTimeForecaster::new(&cfg);
        let s = LeadTimeState::new(10.0, 10.0);
        let n = f.update(&s, 15.0).unwrap();
        // alpha 0.2: 10 + 0.2 * 5
        assert!((n.lead_time_forecast - 11.0).abs() < 1e-12);
        // deviation 50%: 10 + 0.2 * 40
        assert!((n.lead_time_variance - 18.0).abs() < 1e-12);
        // first difference 1.0 smoothed from 0
        assert!((n.trend_indicator - 0.2).abs() < 1e-12);
        assert_eq!(n.observations, 1);
    }

    #[test]
    fn zero_lead_time_rejected() {
        let cfg = EngineConfig::default();
        let f = LeadTimeForecaster::new(&cfg);
        let s = LeadTimeState::new(10.0, 10.0);
        assert!(matches!(
            f.update(&s, 0.0),
            Err(ReplenishError::Validation { .. })
        ));
        assert!(f.initial_state(-2.0).is_err());
    }

    #[test]
    fn lengthening_receipts_trend_up() {
        let cfg = EngineConfig::default();
        let f = LeadTimeForecaster::new(&cfg);
        let mut s = f.initial_state(10.0).unwrap();
        for day in 0..10 {
            s = f.update(&s, 10.0 + 2.0 * day as f64).unwrap();
        }
        assert_eq!(
            s.trend_direction(cfg.lead_time_trend_threshold_pct),
            TrendDirection::Increasing
        );
        assert!(s.lead_time_forecast > 10.0);
    }

    #[test]
    fn steady_receipts_converge() {
        let cfg = EngineConfig::default();
        let f = LeadTimeForecaster::new(&cfg);
        let mut s = f.initial_state(20.0).unwrap();
        for _ in 0..200 {
            s = f.update(&s, 8.0).unwrap();
        }
        assert!((s.lead_time_forecast - 8.0).abs() < 1e-6);
        assert!(s.lead_time_variance < 1e-6);
        assert_eq!(
            s.trend_direction(cfg.lead_time_trend_threshold_pct),
            TrendDirection::Stable
        );
    }

    #[test]
    fn seed_from_receipts() {
        let cfg = EngineConfig::default();
        let f = LeadTimeForecaster::new(&cfg);
        let s = f.seed_from_history(&[10.0, 10.0, 10.0]).unwrap();
        assert!((s.lead_time_forecast - 10.0).abs() < 1e-9);
        assert!(s.lead_time_variance.abs() < 1e-9);

        let s = f.seed_from_history(&[8.0, 12.0]).unwrap();
        // population std dev 2 over mean 10
        assert!((s.lead_time_variance - 20.0).abs() < 1e-9);

        let s = f.seed_from_history(&[9.0]).unwrap();
        assert!((s.lead_time_variance - cfg.initial_lead_time_variance).abs() < 1e-12);
        assert!(f.seed_from_history(&[]).is_err());
    }
}
