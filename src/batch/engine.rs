// src/batch/engine.rs

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::batch::repository::ItemRepository;
use crate::config::EngineConfig;
use crate::error::{ReplenishError, Result};
use crate::exceptions::{DemandCheck, ExceptionEvaluator, StageOutputs};
use crate::forecast::DemandForecaster;
use crate::lead_time::LeadTimeForecaster;
use crate::model::{
    CostInputs, EvaluationPeriod, ExceptionRecord, ForecastState, ItemRecord, LeadTimeState,
    OrderPolicyResult, SafetyStockState, SeasonalProfile,
};
use crate::policy::OrderPolicyAnalyzer;
use crate::safety_stock::{daily_demand_rate, SafetyStockCalculator};

/// Facts observed for one item in the evaluation period.
///
/// Every field is optional: an item may see demand without a receipt, a
/// receipt without demand, or neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodObservation {
    pub item_id: String,
    pub demand: Option<f64>,
    pub lead_time_days: Option<f64>,
    /// Fill rate (%) measured by the order workflow.
    pub service_level_attained: Option<f64>,
}

impl PeriodObservation {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Self::default()
        }
    }

    pub fn with_demand(mut self, demand: f64) -> Self {
        self.demand = Some(demand);
        self
    }

    pub fn with_lead_time(mut self, days: f64) -> Self {
        self.lead_time_days = Some(days);
        self
    }

    pub fn with_service_level(mut self, attained: f64) -> Self {
        self.service_level_attained = Some(attained);
        self
    }
}

/// New state for one item, committed only when every stage succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub item_id: String,
    pub period: EvaluationPeriod,
    pub forecast: ForecastState,
    pub lead_time: LeadTimeState,
    pub safety_stock: SafetyStockState,
    pub order_policy: OrderPolicyResult,
    pub exceptions: Vec<ExceptionRecord>,
    /// Observed minus forecast demand, when demand was observed against an
    /// existing forecast.
    pub forecast_error: Option<f64>,
    /// Forecast for the following period, in seasonal units.
    pub next_forecast: f64,
}

impl ItemUpdate {
    /// Supersedes the record's state with this update.
    pub fn apply_to(&self, record: &mut ItemRecord) {
        record.forecast = Some(self.forecast.clone());
        record.lead_time = Some(self.lead_time.clone());
        record.safety_stock = Some(self.safety_stock.clone());
        record.order_policy = Some(self.order_policy.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub reason: String,
}

/// What a batch run attempted and how it went.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
    /// Updates that were committed, in load order.
    pub updates: Vec<ItemUpdate>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Drives the per-item pipeline over a whole item population.
///
/// Lead time, demand, safety stock, order policy and exception checks run
/// in that order for each item. Items are independent and processed in
/// parallel; one item's failure is recorded and never stops the others.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner<'a> {
    config: &'a EngineConfig,
}

impl<'a> BatchRunner<'a> {
    /// Validates the run configuration once, up front.
    pub fn new(config: &'a EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Computes the next state of a single item without committing it.
    #[tracing::instrument(skip_all, fields(item = %item.item_id, period = period.period_of_year))]
    pub fn process_item(
        &self,
        item: &ItemRecord,
        observation: &PeriodObservation,
        period: EvaluationPeriod,
    ) -> Result<ItemUpdate> {
        let cfg = self.config;
        let profile = item.seasonal_profile.as_ref();

        // Lead time
        let lead_forecaster = LeadTimeForecaster::new(cfg);
        let lead_time = match (&item.lead_time, observation.lead_time_days) {
            (Some(state), Some(days)) => lead_forecaster.update(state, days)?,
            (None, Some(days)) => lead_forecaster.initial_state(days)?,
            (Some(state), None) => state.clone(),
            (None, None) => return Err(ReplenishError::missing("lead-time state or receipt")),
        };

        // Demand
        let demand_forecaster = DemandForecaster::new(cfg);
        let mut demand_check = None;
        let mut forecast_error = None;
        let method = item.master.forecast_method;
        let current = item
            .forecast
            .as_ref()
            .map(|state| demand_forecaster.switch_method(state, method));
        let (forecast, next_forecast) = match (&current, observation.demand) {
            (Some(state), Some(demand)) => {
                let update =
                    demand_forecaster.update(state, demand, period.period_of_year, profile)?;
                demand_check = Some(DemandCheck {
                    observed: demand,
                    forecast: update.previous_forecast,
                    madp: state.madp,
                });
                forecast_error = Some(update.forecast_error);
                (update.state, update.next_forecast)
            }
            (None, Some(demand)) => {
                let state = demand_forecaster.initial_state(
                    demand,
                    method,
                    item.master.periodicity,
                    profile,
                    period.period_of_year,
                )?;
                let next = next_seasonal_forecast(&state, period, profile)?;
                (state, next)
            }
            (Some(state), None) => {
                let next = next_seasonal_forecast(state, period, profile)?;
                (state.clone(), next)
            }
            (None, None) => return Err(ReplenishError::missing("demand state or observation")),
        };

        // Safety stock
        let calculator = SafetyStockCalculator::new(cfg);
        let goal = calculator.resolve_goal(
            item.master.service_level_goal,
            item.vendor.service_level_goal,
        )?;
        let mut days = calculator.compute(
            goal,
            forecast.madp,
            lead_time.lead_time_forecast,
            lead_time.lead_time_variance,
            Some(f64::from(item.current_order_cycle_days())),
        )?;
        if let Some(attained) = observation.service_level_attained {
            if cfg.apply_expost_adjustment {
                days = calculator.adjust_expost(days, goal, attained, cfg.max_adjustment_pct)?;
            }
        }
        let daily_demand =
            daily_demand_rate(forecast.demand_level, forecast.periodicity, cfg.days_per_year);
        let manual_override = item
            .safety_stock
            .as_ref()
            .map(|s| s.manual_override)
            .unwrap_or_default();
        let safety_stock = calculator.finalize(
            days,
            daily_demand,
            manual_override,
            goal,
            observation.service_level_attained,
        );

        // Order policy
        let inputs = CostInputs {
            demand_rate: daily_demand,
            acquisition_cost_per_order: item.vendor.acquisition_cost_per_order,
            carrying_cost_rate: cfg.carrying_cost_rate,
            unit_cost: item.master.purchase_price,
            safety_stock_units: safety_stock.safety_stock_units,
        };
        let order_policy = OrderPolicyAnalyzer::new(cfg).evaluate(&inputs, &item.vendor.brackets)?;

        let exceptions = ExceptionEvaluator::new(cfg).evaluate(
            &item.item_id,
            period,
            &StageOutputs {
                demand: demand_check,
                forecast: Some(&forecast),
                lead_time: Some(&lead_time),
                safety_stock: Some(&safety_stock),
            },
        );

        debug!(
            level = forecast.demand_level,
            safety_stock_days = safety_stock.safety_stock_days,
            cycle = order_policy.order_cycle_days,
            exceptions = exceptions.len(),
            "item evaluated"
        );

        Ok(ItemUpdate {
            item_id: item.item_id.clone(),
            period,
            forecast,
            lead_time,
            safety_stock,
            order_policy,
            exceptions,
            forecast_error,
            next_forecast,
        })
    }

    /// Runs one evaluation period over every item in `repository`.
    ///
    /// Only a failure to load the population aborts the run. Per-item
    /// errors, duplicate or unknown observations and failed commits all
    /// land in the summary.
    pub fn run<R: ItemRepository>(
        &self,
        repository: &mut R,
        observations: &[PeriodObservation],
        period: EvaluationPeriod,
    ) -> Result<BatchSummary> {
        let items = repository.load_items()?;
        info!(items = items.len(), date = %period.date, "batch run started");

        // An item observed twice is rejected for the period; neither
        // observation is applied
        let mut by_item: HashMap<&str, &PeriodObservation> = HashMap::new();
        let mut duplicated: HashSet<&str> = HashSet::new();
        for obs in observations {
            if by_item.insert(obs.item_id.as_str(), obs).is_some() {
                duplicated.insert(obs.item_id.as_str());
            }
        }

        let results: Vec<(String, Result<ItemUpdate>)> = items
            .par_iter()
            .map(|item| {
                let id = item.item_id.as_str();
                if duplicated.contains(id) {
                    let err = ReplenishError::validation(format!("duplicate observation for {id}"));
                    return (item.item_id.clone(), Err(err));
                }
                let fallback = PeriodObservation::new(id);
                let obs = by_item.get(id).copied().unwrap_or(&fallback);
                (item.item_id.clone(), self.process_item(item, obs, period))
            })
            .collect();

        let mut summary = BatchSummary {
            attempted: items.len(),
            ..BatchSummary::default()
        };

        for (item_id, result) in results {
            let committed = result.and_then(|update| {
                repository.commit(&update)?;
                Ok(update)
            });
            match committed {
                Ok(update) => {
                    summary.succeeded += 1;
                    summary.updates.push(update);
                }
                Err(e) => {
                    warn!(item = %item_id, error = %e, "item failed");
                    summary.failures.push(ItemFailure {
                        item_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut known: HashSet<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        for obs in observations {
            // `insert` also keeps a repeated unknown id from counting twice
            if known.insert(obs.item_id.as_str()) {
                warn!(item = %obs.item_id, "observation for unknown item");
                summary.attempted += 1;
                summary.failures.push(ItemFailure {
                    item_id: obs.item_id.clone(),
                    reason: "no item record for observation".to_string(),
                });
            }
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed(),
            "batch run finished"
        );
        Ok(summary)
    }
}

fn next_seasonal_forecast(
    state: &ForecastState,
    period: EvaluationPeriod,
    profile: Option<&SeasonalProfile>,
) -> Result<f64> {
    let index = match profile {
        Some(p) => p.index_for(period.next_period_of_year(state.periodicity))?,
        None => 1.0,
    };
    Ok(state.demand_level * index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::repository::InMemoryRepository;
    use crate::model::{ForecastMethod, ItemMaster, VendorTerms};
    use chrono::NaiveDate;

    fn item(id: &str) -> ItemRecord {
        ItemRecord::new(
            id,
            ItemMaster {
                purchase_price: 5.0,
                order_cycle_days: 14,
                periodicity: 52,
                forecast_method: ForecastMethod::RegularAvs,
                service_level_goal: Some(95.0),
            },
            VendorTerms {
                vendor_id: "V1".into(),
                service_level_goal: None,
                acquisition_cost_per_order: 30.0,
                brackets: vec![],
            },
        )
    }

    fn period() -> EvaluationPeriod {
        EvaluationPeriod::new(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(), 2)
    }

    #[test]
    fn first_observation_creates_state() {
        let cfg = EngineConfig::default();
        let runner = BatchRunner::new(&cfg).unwrap();
        let obs = PeriodObservation::new("A").with_demand(70.0).with_lead_time(10.0);
        let u = runner.process_item(&item("A"), &obs, period()).unwrap();
        assert!((u.forecast.demand_level - 70.0).abs() < 1e-12);
        assert!((u.lead_time.lead_time_forecast - 10.0).abs() < 1e-12);
        assert!(u.forecast_error.is_none());
        assert!(u.safety_stock.safety_stock_days > 0.0);
        assert_eq!(u.period, period());
    }

    #[test]
    fn missing_lead_time_is_configuration_error() {
        let cfg = EngineConfig::default();
        let runner = BatchRunner::new(&cfg).unwrap();
        let obs = PeriodObservation::new("A").with_demand(70.0);
        assert!(matches!(
            runner.process_item(&item("A"), &obs, period()),
            Err(ReplenishError::ConfigurationMissing { .. })
        ));
    }

    #[test]
    fn run_commits_and_reports_unknown_items() {
        let cfg = EngineConfig::default();
        let runner = BatchRunner::new(&cfg).unwrap();
        let mut repo = InMemoryRepository::new([item("A"), item("B")]);
        let observations = vec![
            PeriodObservation::new("A").with_demand(10.0).with_lead_time(7.0),
            PeriodObservation::new("B").with_demand(-3.0).with_lead_time(7.0),
            PeriodObservation::new("Z").with_demand(1.0),
        ];
        let summary = runner.run(&mut repo, &observations, period()).unwrap();
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed(), 2);
        assert!(repo.get("A").unwrap().forecast.is_some());
        assert!(repo.get("B").unwrap().forecast.is_none());
        assert_eq!(repo.audit_trail().len(), 1);
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let cfg = EngineConfig {
            tracking_signal_limit: -1.0,
            ..EngineConfig::default()
        };
        assert!(BatchRunner::new(&cfg).is_err());
    }
}
