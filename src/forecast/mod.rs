//! Adaptive smoothing demand forecaster.
//!
//! Each call to [`DemandForecaster::update`] folds one period of observed
//! demand into an item's [`ForecastState`]:
//!
//! 1. demand is deseasonalised when a profile is attached,
//! 2. the method's [`DemandModel`] moves the level,
//! 3. MADP and the smoothed error share the same smoothing constant,
//! 4. the tracking signal is the smoothed error over the mean absolute
//!    deviation; while it sits outside the configured limit the next update
//!    smooths with a boosted constant.
//!
//! The input state is never modified; callers commit the returned state.

pub mod avs;
pub mod seasonal;
pub mod traits;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{ensure_non_negative, ReplenishError, Result};
use crate::model::{ForecastMethod, ForecastState, SeasonalProfile};

pub use avs::{EnhancedAvs, RegularAvs};
pub use traits::{DemandModel, LevelUpdate};

/// Outcome of folding one period of demand into a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastUpdate {
    pub state: ForecastState,
    /// Observed demand minus the forecast that was in force for the period.
    pub forecast_error: f64,
    /// Forecast (seasonal units) that was in force for the period.
    pub previous_forecast: f64,
    /// Forecast (seasonal units) for the following period.
    pub next_forecast: f64,
    /// Whether the new tracking signal lies outside the configured limit.
    pub tracking_breach: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DemandForecaster<'a> {
    config: &'a EngineConfig,
}

impl<'a> DemandForecaster<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Smoothing constant (0–100) used for the next update of `state`.
    ///
    /// Boosted by `tracking_alpha_boost` while the tracking signal is out of
    /// limits, capped at 100.
    pub fn effective_alpha(&self, state: &ForecastState) -> f64 {
        if state.tracking_signal.abs() > self.config.tracking_signal_limit {
            (state.alpha_factor * self.config.tracking_alpha_boost).min(100.0)
        } else {
            state.alpha_factor
        }
    }

    /// Folds one period of observed demand into `state`.
    ///
    /// `period_of_year` selects the seasonal index when `profile` is given.
    /// Negative or non-finite demand is rejected.
    pub fn update(
        &self,
        state: &ForecastState,
        latest_period_demand: f64,
        period_of_year: u16,
        profile: Option<&SeasonalProfile>,
    ) -> Result<ForecastUpdate> {
        ensure_non_negative("latest period demand", latest_period_demand)?;
        state.validate()?;

        let index = seasonal_index(state, profile, period_of_year)?;
        let demand = latest_period_demand / index;
        let previous_forecast = state.demand_level * index;
        let alpha = self.effective_alpha(state) / 100.0;
        let eps = self.config.min_demand_denominator;

        let error = demand - state.demand_level;
        let level = state.forecast_method.model().smooth(state, demand, alpha);

        let relative_error = error.abs() / state.demand_level.max(eps) * 100.0;
        let madp = (state.madp + alpha * (relative_error - state.madp))
            .clamp(0.0, self.config.max_madp);

        let smoothed_error = state.smoothed_error + alpha * (error - state.smoothed_error);

        let mut new_state = ForecastState {
            demand_level: level.demand_level,
            madp,
            tracking_signal: 0.0,
            smoothed_error,
            occurrence_probability: level.occurrence_probability,
            demand_size: level.demand_size,
            periods_since_demand: level.periods_since_demand,
            periods_observed: state.periods_observed.saturating_add(1),
            ..state.clone()
        };
        let mad_units = new_state.mad_units(eps);
        if mad_units > f64::EPSILON {
            new_state.tracking_signal = (smoothed_error / mad_units).clamp(-1.0, 1.0);
        }
        let tracking_signal = new_state.tracking_signal;

        let limit = self.config.tracking_signal_limit;
        let tracking_breach = tracking_signal.abs() > limit;
        if tracking_breach && state.tracking_signal.abs() <= limit {
            warn!(
                tracking_signal,
                limit, "tracking signal left limits; boosting smoothing"
            );
        }

        let next_period = period_of_year % state.periodicity + 1;
        let next_index = match profile {
            Some(p) => p.index_for(next_period)?,
            None => 1.0,
        };

        debug!(
            level = new_state.demand_level,
            madp, tracking_signal, alpha, "demand forecast updated"
        );

        Ok(ForecastUpdate {
            forecast_error: latest_period_demand - previous_forecast,
            previous_forecast,
            next_forecast: new_state.demand_level * next_index,
            tracking_breach,
            state: new_state,
        })
    }

    /// State for an item seen for the first time.
    pub fn initial_state(
        &self,
        first_demand: f64,
        method: ForecastMethod,
        periodicity: u16,
        profile: Option<&SeasonalProfile>,
        period_of_year: u16,
    ) -> Result<ForecastState> {
        ensure_non_negative("first period demand", first_demand)?;
        let mut state = ForecastState::new(
            method,
            first_demand,
            self.config.default_alpha_factor,
            periodicity,
        );
        if let Some(p) = profile {
            let index = seasonal_index(&state, Some(p), period_of_year)?;
            state = ForecastState::new(
                method,
                first_demand / index,
                self.config.default_alpha_factor,
                periodicity,
            );
            state.seasonal_profile_id = Some(p.id.clone());
        }
        state.periods_observed = 1;
        state.periods_since_demand = if first_demand > 0.0 { 0 } else { 1 };
        Ok(state)
    }

    /// Seeds a state from demand history, most recent period first.
    ///
    /// The level is an exponentially weighted average (weight `exp(-0.1 i)`)
    /// and MADP the mean absolute deviation around it.
    pub fn seed_from_history(
        &self,
        history: &[f64],
        method: ForecastMethod,
        periodicity: u16,
    ) -> Result<ForecastState> {
        if history.is_empty() {
            return Err(ReplenishError::validation("demand history is empty"));
        }
        for v in history {
            ensure_non_negative("demand history value", *v)?;
        }

        let level = weighted_recent_average(history);
        let madp = if level <= 0.0 {
            if history.iter().all(|h| *h == 0.0) {
                0.0
            } else {
                self.config.max_madp
            }
        } else {
            let mad = history.iter().map(|h| (h - level).abs()).sum::<f64>()
                / history.len() as f64;
            (mad / level * 100.0).clamp(0.0, self.config.max_madp)
        };

        let mut state =
            ForecastState::new(method, level, self.config.default_alpha_factor, periodicity);
        state.madp = madp;
        state.periods_observed = history.len() as u32;
        state.periods_since_demand = history
            .iter()
            .position(|h| *h > 0.0)
            .unwrap_or(history.len()) as u32;

        if method == ForecastMethod::EnhancedAvs {
            let nonzero: Vec<f64> = history.iter().copied().filter(|h| *h > 0.0).collect();
            state.occurrence_probability = nonzero.len() as f64 / history.len() as f64;
            state.demand_size = if nonzero.is_empty() {
                0.0
            } else {
                nonzero.iter().sum::<f64>() / nonzero.len() as f64
            };
        }
        Ok(state)
    }

    /// Clears the tracking signal after a buyer acknowledges an exception.
    pub fn acknowledge(&self, state: &ForecastState) -> ForecastState {
        ForecastState {
            tracking_signal: 0.0,
            smoothed_error: 0.0,
            ..state.clone()
        }
    }

    /// Moves `state` onto `method` when the item master has switched it.
    ///
    /// The occurrence and size series restart from the current level and
    /// the tracking signal is cleared. A state already on `method` comes
    /// back unchanged.
    pub fn switch_method(&self, state: &ForecastState, method: ForecastMethod) -> ForecastState {
        if state.forecast_method == method {
            return state.clone();
        }
        info!(from = ?state.forecast_method, to = ?method, "forecast method switched");
        let seeded = ForecastState::new(
            method,
            state.demand_level,
            state.alpha_factor,
            state.periodicity,
        );
        ForecastState {
            forecast_method: method,
            occurrence_probability: seeded.occurrence_probability,
            demand_size: seeded.demand_size,
            ..self.acknowledge(state)
        }
    }

    /// Replaces the smoothing constant; the tracking signal restarts.
    pub fn set_alpha_factor(
        &self,
        state: &ForecastState,
        alpha_factor: f64,
    ) -> Result<ForecastState> {
        if !(0.0..=100.0).contains(&alpha_factor) {
            return Err(ReplenishError::validation(format!(
                "alpha_factor must be in 0..=100, got {alpha_factor}"
            )));
        }
        Ok(ForecastState {
            alpha_factor,
            ..self.acknowledge(state)
        })
    }
}

/// Exponentially weighted average, most recent value first.
pub(crate) fn weighted_recent_average(values: &[f64]) -> f64 {
    let (sum, weight_sum) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(s, w), (i, v)| {
            let weight = (-0.1 * i as f64).exp();
            (s + v * weight, w + weight)
        });
    if weight_sum > 0.0 {
        sum / weight_sum
    } else {
        0.0
    }
}

fn seasonal_index(
    state: &ForecastState,
    profile: Option<&SeasonalProfile>,
    period_of_year: u16,
) -> Result<f64> {
    let Some(p) = profile else {
        return Ok(1.0);
    };
    if p.len() != state.periodicity as usize {
        return Err(ReplenishError::validation(format!(
            "seasonal profile '{}' has {} periods but item periodicity is {}",
            p.id,
            p.len(),
            state.periodicity
        )));
    }
    p.index_for(period_of_year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(level: f64) -> ForecastState {
        ForecastState::new(ForecastMethod::RegularAvs, level, 10.0, 52)
    }

    #[test]
    fn smoothing_and_madp_step() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let mut s = state(100.0);
        s.madp = 10.0;
        let u = f.update(&s, 150.0, 1, None).unwrap();
        assert!((u.state.demand_level - 105.0).abs() < 1e-12);
        // 10 + 0.1 * (50 - 10)
        assert!((u.state.madp - 14.0).abs() < 1e-12);
        assert!((u.forecast_error - 50.0).abs() < 1e-12);
        assert!((u.previous_forecast - 100.0).abs() < 1e-12);
        assert_eq!(u.state.periods_observed, 1);
    }

    #[test]
    fn negative_demand_rejected() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let r = f.update(&state(10.0), -1.0, 1, None);
        assert!(matches!(r, Err(ReplenishError::Validation { .. })));
    }

    #[test]
    fn zero_level_does_not_divide_by_zero() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let u = f.update(&state(0.0), 5.0, 1, None).unwrap();
        assert!(u.state.madp.is_finite());
        assert!(u.state.madp <= cfg.max_madp);
        assert!(u.state.tracking_signal.is_finite());
    }

    #[test]
    fn boosted_alpha_while_breached() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let mut s = state(100.0);
        assert!((f.effective_alpha(&s) - 10.0).abs() < 1e-12);
        s.tracking_signal = -0.9;
        assert!((f.effective_alpha(&s) - 20.0).abs() < 1e-12);
        s.alpha_factor = 80.0;
        assert!((f.effective_alpha(&s) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn acknowledge_and_alpha_change_reset_signal() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let mut s = state(100.0);
        s.tracking_signal = 0.8;
        s.smoothed_error = 12.0;
        let a = f.acknowledge(&s);
        assert_eq!(a.tracking_signal, 0.0);
        assert_eq!(a.smoothed_error, 0.0);
        let b = f.set_alpha_factor(&s, 25.0).unwrap();
        assert_eq!(b.tracking_signal, 0.0);
        assert_eq!(b.alpha_factor, 25.0);
        assert!(f.set_alpha_factor(&s, 150.0).is_err());
    }

    #[test]
    fn switching_method_reseeds_intermittent_series() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let mut s = state(30.0);
        s.demand_size = 12.0;
        s.occurrence_probability = 0.4;
        s.tracking_signal = 0.7;
        s.smoothed_error = 9.0;

        let same = f.switch_method(&s, ForecastMethod::RegularAvs);
        assert_eq!(same, s);

        let switched = f.switch_method(&s, ForecastMethod::EnhancedAvs);
        assert_eq!(switched.forecast_method, ForecastMethod::EnhancedAvs);
        assert_eq!(switched.occurrence_probability, 1.0);
        assert_eq!(switched.demand_size, 30.0);
        assert_eq!(switched.demand_level, 30.0);
        assert_eq!(switched.tracking_signal, 0.0);
        assert_eq!(switched.smoothed_error, 0.0);
    }

    #[test]
    fn seasonal_round_trip() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let profile = SeasonalProfile::new("p", vec![0.5, 1.5]).unwrap();
        let mut s = ForecastState::new(ForecastMethod::RegularAvs, 100.0, 10.0, 2);
        s.seasonal_profile_id = Some("p".into());
        // Period 2 demand of 150 is exactly the seasonal expectation
        let u = f.update(&s, 150.0, 2, Some(&profile)).unwrap();
        assert!((u.state.demand_level - 100.0).abs() < 1e-12);
        assert!(u.forecast_error.abs() < 1e-12);
        assert!((u.next_forecast - 50.0).abs() < 1e-12);
    }

    #[test]
    fn profile_length_must_match_periodicity() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let profile = SeasonalProfile::new("p", vec![1.0; 12]).unwrap();
        assert!(f.update(&state(10.0), 10.0, 1, Some(&profile)).is_err());
    }

    #[test]
    fn initial_state_deseasonalises() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let profile = SeasonalProfile::new("p", vec![2.0, 0.5, 0.5, 1.0]).unwrap();
        let s = f
            .initial_state(40.0, ForecastMethod::RegularAvs, 4, Some(&profile), 1)
            .unwrap();
        assert!((s.demand_level - 20.0).abs() < 1e-12);
        assert_eq!(s.seasonal_profile_id.as_deref(), Some("p"));
        assert_eq!(s.periods_observed, 1);
    }

    #[test]
    fn seed_from_flat_history() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let s = f
            .seed_from_history(&[20.0; 8], ForecastMethod::RegularAvs, 52)
            .unwrap();
        assert!((s.demand_level - 20.0).abs() < 1e-9);
        assert!(s.madp.abs() < 1e-9);
        assert_eq!(s.periods_observed, 8);
    }

    #[test]
    fn seed_intermittent_history() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let s = f
            .seed_from_history(&[0.0, 0.0, 6.0, 0.0, 4.0], ForecastMethod::EnhancedAvs, 52)
            .unwrap();
        assert!((s.occurrence_probability - 0.4).abs() < 1e-12);
        assert!((s.demand_size - 5.0).abs() < 1e-12);
        assert_eq!(s.periods_since_demand, 2);
    }

    #[test]
    fn seed_all_zero_history() {
        let cfg = EngineConfig::default();
        let f = DemandForecaster::new(&cfg);
        let s = f
            .seed_from_history(&[0.0; 4], ForecastMethod::RegularAvs, 52)
            .unwrap();
        assert_eq!(s.madp, 0.0);
        assert!(f.seed_from_history(&[], ForecastMethod::RegularAvs, 52).is_err());
    }
}
