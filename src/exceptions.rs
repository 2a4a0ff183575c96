// src/exceptions.rs

//! Threshold checks that flag items for buyer attention.
//!
//! The evaluator only reads stage outputs. Resolving an exception (and any
//! resulting reset of the tracking signal) is left to the caller.

use crate::config::EngineConfig;
use crate::model::{
    EvaluationPeriod, ExceptionKind, ExceptionRecord, ForecastState, LeadTimeState,
    SafetyStockState,
};

/// Demand observed in a period alongside the forecast that was in force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandCheck {
    pub observed: f64,
    /// Forecast for the period, in seasonal units.
    pub forecast: f64,
    /// MADP before the period's update.
    pub madp: f64,
}

/// Everything one item's pipeline produced in a period.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageOutputs<'s> {
    pub demand: Option<DemandCheck>,
    pub forecast: Option<&'s ForecastState>,
    pub lead_time: Option<&'s LeadTimeState>,
    pub safety_stock: Option<&'s SafetyStockState>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExceptionEvaluator<'a> {
    config: &'a EngineConfig,
}

impl<'a> ExceptionEvaluator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Runs every check that has data and returns the breaches found.
    pub fn evaluate(
        &self,
        item_id: &str,
        period: EvaluationPeriod,
        outputs: &StageOutputs<'_>,
    ) -> Vec<ExceptionRecord> {
        let mut found = Vec::new();
        if let Some(d) = outputs.demand {
            found.extend(self.demand_spike(item_id, period, &d));
        }
        if let Some(f) = outputs.forecast {
            found.extend(self.tracking_signal(item_id, period, f));
        }
        if let Some(l) = outputs.lead_time {
            found.extend(self.lead_time_variance(item_id, period, l));
        }
        if let Some(s) = outputs.safety_stock {
            found.extend(self.service_level(item_id, period, s));
        }
        found
    }

    /// Demand further from forecast than `forecast_demand_limit` MADs.
    ///
    /// With no deviation history any demand above twice the forecast counts,
    /// as does any demand against a zero forecast.
    pub fn demand_spike(
        &self,
        item_id: &str,
        period: EvaluationPeriod,
        check: &DemandCheck,
    ) -> Option<ExceptionRecord> {
        let limit = self.config.forecast_demand_limit;
        let deviation = (check.observed - check.forecast).abs();
        let mad = check.madp / 100.0 * check.forecast.max(self.config.min_demand_denominator);

        if mad > f64::EPSILON {
            let multiple = deviation / mad;
            return (multiple > limit).then(|| {
                ExceptionRecord::open(item_id, ExceptionKind::DemandSpike, period, multiple, limit)
            });
        }

        let spiked = if check.forecast <= 0.0 {
            check.observed > 0.0
        } else {
            check.observed > 2.0 * check.forecast
        };
        spiked.then(|| {
            ExceptionRecord::open(
                item_id,
                ExceptionKind::DemandSpike,
                period,
                check.observed,
                2.0 * check.forecast,
            )
        })
    }

    pub fn tracking_signal(
        &self,
        item_id: &str,
        period: EvaluationPeriod,
        state: &ForecastState,
    ) -> Option<ExceptionRecord> {
        let limit = self.config.tracking_signal_limit;
        (state.tracking_signal.abs() > limit).then(|| {
            ExceptionRecord::open(
                item_id,
                ExceptionKind::TrackingSignalBreach,
                period,
                state.tracking_signal,
                limit,
            )
        })
    }

    pub fn lead_time_variance(
        &self,
        item_id: &str,
        period: EvaluationPeriod,
        state: &LeadTimeState,
    ) -> Option<ExceptionRecord> {
        let ceiling = self.config.lead_time_variance_ceiling;
        (state.lead_time_variance > ceiling).then(|| {
            ExceptionRecord::open(
                item_id,
                ExceptionKind::LeadTimeVarianceBreach,
                period,
                state.lead_time_variance,
                ceiling,
            )
        })
    }

    /// Attained service level below the goal by more than the tolerance band.
    /// Nothing is reported until a fill rate has been measured.
    pub fn service_level(
        &self,
        item_id: &str,
        period: EvaluationPeriod,
        state: &SafetyStockState,
    ) -> Option<ExceptionRecord> {
        let attained = state.service_level_attained?;
        let floor = state.service_level_goal - self.config.service_level_tolerance;
        (attained < floor).then(|| {
            ExceptionRecord::open(
                item_id,
                ExceptionKind::ServiceLevelBreach,
                period,
                attained,
                floor,
            )
        })
    }
}
