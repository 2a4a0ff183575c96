// src/model/forecast.rs

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_non_negative, ReplenishError, Result};

/// Which adaptive smoothing variant drives an item's forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastMethod {
    /// Single-series exponential smoothing.
    RegularAvs,
    /// Separate smoothing of demand occurrence and size, for intermittent items.
    EnhancedAvs,
}

/// Persisted demand-forecast state of a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastState {
    /// Smoothed (deseasonalised) demand per period.
    pub demand_level: f64,
    /// Mean absolute deviation as a percentage of the demand level.
    pub madp: f64,
    /// Smoothed error over mean absolute deviation, in [-1, 1].
    pub tracking_signal: f64,
    /// Signed smoothed forecast error in deseasonalised units.
    pub smoothed_error: f64,
    /// Smoothing responsiveness on a 0–100 scale.
    pub alpha_factor: f64,
    pub forecast_method: ForecastMethod,
    pub seasonal_profile_id: Option<String>,
    /// Number of forecast periods per year.
    pub periodicity: u16,

    // Enhanced AVS
    /// Smoothed probability that a period sees any demand.
    pub occurrence_probability: f64,
    /// Smoothed demand size over periods with demand.
    pub demand_size: f64,
    pub periods_since_demand: u32,

    pub periods_observed: u32,
}

impl ForecastState {
    /// Creates a state with no observed variability.
    pub fn new(
        forecast_method: ForecastMethod,
        demand_level: f64,
        alpha_factor: f64,
        periodicity: u16,
    ) -> Self {
        Self {
            demand_level,
            madp: 0.0,
            tracking_signal: 0.0,
            smoothed_error: 0.0,
            alpha_factor,
            forecast_method,
            seasonal_profile_id: None,
            periodicity,
            occurrence_probability: if demand_level > 0.0 { 1.0 } else { 0.0 },
            demand_size: demand_level,
            periods_since_demand: 0,
            periods_observed: 0,
        }
    }

    /// Mean absolute deviation expressed in demand units.
    pub fn mad_units(&self, floor: f64) -> f64 {
        self.madp / 100.0 * self.demand_level.max(floor)
    }

    /// Checks the numeric invariants of the state.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("demand_level", self.demand_level)?;
        ensure_non_negative("madp", self.madp)?;
        ensure_finite("tracking_signal", self.tracking_signal)?;
        ensure_finite("smoothed_error", self.smoothed_error)?;
        ensure_non_negative("demand_size", self.demand_size)?;
        if !(0.0..=100.0).contains(&self.alpha_factor) {
            return Err(ReplenishError::validation(format!(
                "alpha_factor must be in 0..=100, got {}",
                self.alpha_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.occurrence_probability) {
            return Err(ReplenishError::validation(format!(
                "occurrence_probability must be in 0..=1, got {}",
                self.occurrence_probability
            )));
        }
        if self.periodicity == 0 {
            return Err(ReplenishError::validation("periodicity must be at least 1"));
        }
        Ok(())
    }
}

/// Multiplicative seasonal indices keyed by period of year (1-based).
///
/// Deserialisation goes through [`SeasonalProfile::new`], so a stored
/// profile with a zero or non-finite index is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredProfile")]
pub struct SeasonalProfile {
    pub id: String,
    indices: Vec<f64>,
}

#[derive(Deserialize)]
struct StoredProfile {
    id: String,
    indices: Vec<f64>,
}

impl TryFrom<StoredProfile> for SeasonalProfile {
    type Error = ReplenishError;

    fn try_from(stored: StoredProfile) -> Result<Self> {
        Self::new(stored.id, stored.indices)
    }
}

impl SeasonalProfile {
    /// Creates a profile, rejecting empty or non-positive indices.
    pub fn new(id: impl Into<String>, indices: Vec<f64>) -> Result<Self> {
        if indices.is_empty() {
            return Err(ReplenishError::validation("seasonal profile has no indices"));
        }
        if let Some((i, v)) = indices
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v <= 0.0)
        {
            return Err(ReplenishError::validation(format!(
                "seasonal index for period {} must be finite and positive, got {v}",
                i + 1
            )));
        }
        Ok(Self {
            id: id.into(),
            indices,
        })
    }

    pub fn indices(&self) -> &[f64] {
        &self.indices
    }

    /// Number of periods covered by the profile.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the index for a 1-based period of year.
    pub fn index_for(&self, period_of_year: u16) -> Result<f64> {
        let p = period_of_year as usize;
        if p == 0 || p > self.indices.len() {
            return Err(ReplenishError::validation(format!(
                "period {period_of_year} outside seasonal profile '{}' (1..={})",
                self.id,
                self.indices.len()
            )));
        }
        Ok(self.indices[p - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_valid() {
        let s = ForecastState::new(ForecastMethod::RegularAvs, 40.0, 10.0, 52);
        assert!(s.validate().is_ok());
        assert!((s.occurrence_probability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_alpha_out_of_range() {
        let mut s = ForecastState::new(ForecastMethod::RegularAvs, 40.0, 10.0, 52);
        s.alpha_factor = 101.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn mad_units_uses_floor() {
        let mut s = ForecastState::new(ForecastMethod::RegularAvs, 0.0, 10.0, 12);
        s.madp = 50.0;
        assert!((s.mad_units(2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn profile_lookup_is_one_based() {
        let p = SeasonalProfile::new("p", vec![0.5, 1.5]).unwrap();
        assert!((p.index_for(1).unwrap() - 0.5).abs() < f64::EPSILON);
        assert!((p.index_for(2).unwrap() - 1.5).abs() < f64::EPSILON);
        assert!(p.index_for(0).is_err());
        assert!(p.index_for(3).is_err());
    }

    #[test]
    fn profile_rejects_zero_index() {
        assert!(SeasonalProfile::new("p", vec![1.0, 0.0]).is_err());
        assert!(SeasonalProfile::new("p", vec![]).is_err());
    }

    #[test]
    fn stored_profile_is_validated_on_load() {
        let ok: SeasonalProfile = toml::from_str("id = \"p\"\nindices = [0.5, 1.5]").unwrap();
        assert_eq!(ok.indices(), &[0.5, 1.5]);

        let zero = toml::from_str::<SeasonalProfile>("id = \"p\"\nindices = [0.0, 1.0]");
        let err = zero.unwrap_err().to_string();
        assert!(err.contains("must be finite and positive"), "{err}");
        assert!(toml::from_str::<SeasonalProfile>("id = \"p\"\nindices = []").is_err());
    }
}
