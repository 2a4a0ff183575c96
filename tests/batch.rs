use chrono::NaiveDate;

use replenishment_engine::batch::{
    BatchRunner, InMemoryRepository, ItemRepository, ItemUpdate, PeriodObservation,
};
use replenishment_engine::model::{
    Bracket, EvaluationPeriod, ExceptionKind, ForecastMethod, ForecastState, ItemMaster,
    ItemRecord, ManualOverride, OverrideMode, SafetyStockState, VendorTerms,
};
use replenishment_engine::{EngineConfig, ReplenishError, Result};

fn item(id: &str, goal: Option<f64>) -> ItemRecord {
    ItemRecord::new(
        id,
        ItemMaster {
            purchase_price: 8.0,
            order_cycle_days: 14,
            periodicity: 52,
            forecast_method: ForecastMethod::RegularAvs,
            service_level_goal: None,
        },
        VendorTerms {
            vendor_id: "V-1".into(),
            service_level_goal: goal,
            acquisition_cost_per_order: 40.0,
            brackets: vec![
                Bracket::new(1, 0.0, None, 0.0),
                Bracket::new(2, 500.0, None, 4.0),
            ],
        },
    )
}

fn week(n: u16) -> EvaluationPeriod {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    EvaluationPeriod::new(start + chrono::Duration::weeks(i64::from(n) - 1), n)
}

#[test]
fn failures_are_isolated_per_item() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let mut repo = InMemoryRepository::new([
        item("GOOD", Some(95.0)),
        item("NO-GOAL", None),
        item("BAD-DEMAND", Some(95.0)),
        item("NO-RECEIPT", Some(95.0)),
    ]);
    let observations = vec![
        PeriodObservation::new("GOOD").with_demand(70.0).with_lead_time(10.0),
        PeriodObservation::new("NO-GOAL").with_demand(70.0).with_lead_time(10.0),
        PeriodObservation::new("BAD-DEMAND").with_demand(-5.0).with_lead_time(10.0),
        PeriodObservation::new("NO-RECEIPT").with_demand(70.0),
    ];

    let summary = runner.run(&mut repo, &observations, week(1)).unwrap();
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed(), 3);

    let reason = |id: &str| {
        summary
            .failures
            .iter()
            .find(|f| f.item_id == id)
            .map(|f| f.reason.clone())
            .unwrap()
    };
    assert!(reason("NO-GOAL").starts_with("missing configuration"));
    assert!(reason("BAD-DEMAND").starts_with("validation failed"));
    assert!(reason("NO-RECEIPT").starts_with("missing configuration"));

    // Failed items keep their previous (empty) state
    for id in ["NO-GOAL", "BAD-DEMAND", "NO-RECEIPT"] {
        let r = repo.get(id).unwrap();
        assert!(r.forecast.is_none() && r.lead_time.is_none() && r.safety_stock.is_none());
    }
    assert!(repo.get("GOOD").unwrap().order_policy.is_some());
}

#[test]
fn company_goal_fills_in_for_vendor() {
    let cfg = EngineConfig::default().with_service_level_goal(90.0);
    let runner = BatchRunner::new(&cfg).unwrap();
    let obs = PeriodObservation::new("NO-GOAL").with_demand(70.0).with_lead_time(10.0);
    let update = runner.process_item(&item("NO-GOAL", None), &obs, week(1)).unwrap();
    assert_eq!(update.safety_stock.service_level_goal, 90.0);
}

#[test]
fn missing_goal_without_company_default() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let obs = PeriodObservation::new("NO-GOAL").with_demand(70.0).with_lead_time(10.0);
    assert!(matches!(
        runner.process_item(&item("NO-GOAL", None), &obs, week(1)),
        Err(ReplenishError::ConfigurationMissing { .. })
    ));
}

#[test]
fn state_carries_across_periods() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let mut repo = InMemoryRepository::new([item("A", Some(95.0))]);

    let first = vec![PeriodObservation::new("A").with_demand(70.0).with_lead_time(10.0)];
    runner.run(&mut repo, &first, week(1)).unwrap();

    // No receipt this week: the lead-time forecast carries over
    let second = vec![PeriodObservation::new("A").with_demand(150.0)];
    let summary = runner.run(&mut repo, &second, week(2)).unwrap();
    assert_eq!(summary.succeeded, 1);

    let update = &summary.updates[0];
    assert_eq!(update.forecast_error, Some(80.0));
    assert!((update.forecast.demand_level - 78.0).abs() < 1e-9);
    assert!((update.lead_time.lead_time_forecast - 10.0).abs() < 1e-12);
    assert!(update
        .exceptions
        .iter()
        .any(|e| e.kind == ExceptionKind::DemandSpike));

    assert_eq!(repo.audit_trail().len(), 2);
    assert_eq!(repo.get("A").unwrap().forecast.as_ref(), Some(&update.forecast));
    assert_eq!(repo.exceptions().len(), update.exceptions.len());
}

#[test]
fn manual_override_survives_runs() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let mut record = item("A", Some(95.0));
    record.safety_stock = Some(SafetyStockState {
        safety_stock_days: 0.0,
        safety_stock_units: 0.0,
        manual_override: ManualOverride::new(4.0, OverrideMode::Always),
        service_level_goal: 95.0,
        service_level_attained: None,
    });
    let obs = PeriodObservation::new("A").with_demand(70.0).with_lead_time(10.0);
    let update = runner.process_item(&record, &obs, week(1)).unwrap();

    assert_eq!(update.safety_stock.safety_stock_days, 4.0);
    assert_eq!(update.safety_stock.manual_override.mode, OverrideMode::Always);
    // 70 per week over 52 weeks in a 365-day year
    let daily = 70.0 * 52.0 / 365.0;
    assert!((update.safety_stock.safety_stock_units - 4.0 * daily).abs() < 1e-9);
}

#[test]
fn low_fill_rate_raises_service_level_exception() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let obs = PeriodObservation::new("A")
        .with_demand(70.0)
        .with_lead_time(10.0)
        .with_service_level(80.0);
    let update = runner.process_item(&item("A", Some(95.0)), &obs, week(1)).unwrap();

    let plain = runner
        .process_item(
            &item("A", Some(95.0)),
            &PeriodObservation::new("A").with_demand(70.0).with_lead_time(10.0),
            week(1),
        )
        .unwrap();
    // 15 points short, capped at +10%
    let expected = plain.safety_stock.safety_stock_days * 1.10;
    assert!((update.safety_stock.safety_stock_days - expected).abs() < 1e-9);
    assert!(update
        .exceptions
        .iter()
        .any(|e| e.kind == ExceptionKind::ServiceLevelBreach));
}

#[test]
fn duplicate_observations_reject_the_item() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let mut repo = InMemoryRepository::new([item("A", Some(95.0)), item("B", Some(95.0))]);
    let observations = vec![
        PeriodObservation::new("A").with_demand(10.0).with_lead_time(5.0),
        PeriodObservation::new("B").with_demand(10.0).with_lead_time(5.0),
        PeriodObservation::new("A").with_demand(500.0).with_lead_time(5.0),
    ];

    let summary = runner.run(&mut repo, &observations, week(1)).unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.failures[0].item_id, "A");
    assert!(summary.failures[0].reason.contains("duplicate observation"));
    assert!(repo.get("A").unwrap().forecast.is_none());
    assert!(repo.get("B").unwrap().forecast.is_some());
}

#[test]
fn master_method_change_takes_effect() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let mut record = item("A", Some(95.0));
    record.master.forecast_method = ForecastMethod::EnhancedAvs;
    let mut state = ForecastState::new(ForecastMethod::RegularAvs, 70.0, 10.0, 52);
    state.madp = 10.0;
    state.tracking_signal = 0.9;
    state.smoothed_error = 20.0;
    record.forecast = Some(state);

    let obs = PeriodObservation::new("A").with_demand(70.0).with_lead_time(10.0);
    let update = runner.process_item(&record, &obs, week(2)).unwrap();

    assert_eq!(update.forecast.forecast_method, ForecastMethod::EnhancedAvs);
    assert!((update.forecast.occurrence_probability - 1.0).abs() < 1e-12);
    assert!((update.forecast.demand_size - 70.0).abs() < 1e-9);
    assert!((update.forecast.demand_level - 70.0).abs() < 1e-9);
    // The old signal is dropped rather than carried into the new method
    assert_eq!(update.forecast.tracking_signal, 0.0);
}

/// Repository whose commits fail for one item.
struct FlakyRepository {
    inner: InMemoryRepository,
    reject: &'static str,
}

impl ItemRepository for FlakyRepository {
    fn load_items(&self) -> Result<Vec<ItemRecord>> {
        self.inner.load_items()
    }

    fn commit(&mut self, update: &ItemUpdate) -> Result<()> {
        if update.item_id == self.reject {
            return Err(ReplenishError::Persistence {
                reason: "write conflict".into(),
            });
        }
        self.inner.commit(update)
    }
}

#[test]
fn commit_failures_are_reported() {
    let cfg = EngineConfig::default();
    let runner = BatchRunner::new(&cfg).unwrap();
    let mut repo = FlakyRepository {
        inner: InMemoryRepository::new([item("A", Some(95.0)), item("B", Some(95.0))]),
        reject: "B",
    };
    let observations = vec![
        PeriodObservation::new("A").with_demand(10.0).with_lead_time(5.0),
        PeriodObservation::new("B").with_demand(10.0).with_lead_time(5.0),
    ];
    let summary = runner.run(&mut repo, &observations, week(1)).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failures[0].item_id, "B");
    assert!(summary.failures[0].reason.contains("write conflict"));
    assert!(repo.inner.get("B").unwrap().forecast.is_none());
}
