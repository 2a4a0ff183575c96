// src/model/lead_time.rs

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_non_negative, ensure_positive, Result};

/// Direction of the smoothed lead-time trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Persisted lead-time forecast of a single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeState {
    /// Forecast lead time in days. Always positive.
    pub lead_time_forecast: f64,
    /// Smoothed absolute deviation as a percentage of the forecast.
    pub lead_time_variance: f64,
    /// Smoothed first difference of successive forecasts, in days.
    pub trend_indicator: f64,
    pub observations: u32,
}

impl LeadTimeState {
    pub fn new(lead_time_forecast: f64, lead_time_variance: f64) -> Self {
        Self {
            lead_time_forecast,
            lead_time_variance,
            trend_indicator: 0.0,
            observations: 0,
        }
    }

    /// Classifies the trend indicator against a threshold given as a
    /// percentage of the current forecast.
    ///
    /// Diagnostic only; the trend never feeds back into safety stock.
    pub fn trend_direction(&self, threshold_pct: f64) -> TrendDirection {
        let threshold = self.lead_time_forecast * threshold_pct / 100.0;
        if self.trend_indicator > threshold {
            TrendDirection::Increasing
        } else if self.trend_indicator < -threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("lead_time_forecast", self.lead_time_forecast)?;
        ensure_non_negative("lead_time_variance", self.lead_time_variance)?;
        ensure_finite("trend_indicator", self.trend_indicator)
    }
}
