mod cli;
mod logging;

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use replenishment_engine::batch::{BatchRunner, InMemoryRepository, PeriodObservation};
use replenishment_engine::io::{demand, reporting};
use replenishment_engine::model::{
    Bracket, EvaluationPeriod, ForecastMethod, ItemMaster, ItemRecord, VendorTerms,
};
use replenishment_engine::EngineConfig;

use crate::cli::Cli;

/// Weeks between receipts in the synthetic population.
const RECEIPT_INTERVAL: usize = 4;
/// Weeks between measured fill rates.
const FILL_RATE_INTERVAL: usize = 13;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    println!("=== Replenishment Batch ===");

    // 1. SETUP CONFIGURATION
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(goal) = cli.service_level {
        config.service_level_goal = Some(goal);
    }
    let runner = BatchRunner::new(&config).context("invalid engine configuration")?;

    // 2. GENERATE OBSERVATIONS
    let mut rng = StdRng::seed_from_u64(cli.seed);
    let population = synthetic_population(&mut rng, cli.items, cli.periods)?;
    let mut repo = InMemoryRepository::new(population.iter().map(|s| s.record.clone()));
    println!(
        "Generated {} items over {} weekly periods (seed {})",
        cli.items, cli.periods, cli.seed
    );

    // 3. RUN ONE BATCH PER PERIOD
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    let mut updates = Vec::new();
    let mut failures = Vec::new();
    for week in 0..cli.periods {
        let period = EvaluationPeriod::new(
            start + Duration::weeks(week as i64),
            (week % 52) as u16 + 1,
        );
        let observations: Vec<PeriodObservation> =
            population.iter().map(|s| s.observation(week)).collect();

        let summary = runner
            .run(&mut repo, &observations, period)
            .with_context(|| format!("batch for {} failed to load", period.date))?;
        info!(
            week,
            succeeded = summary.succeeded,
            failed = summary.failed(),
            "period complete"
        );
        updates.extend(summary.updates);
        failures.extend(summary.failures);
    }

    // 4. EXPORT RESULTS
    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("cannot create {}", cli.output.display()))?;
    let updates_path = cli.output.join("updates.csv");
    let exceptions_path = cli.output.join("exceptions.csv");
    let failures_path = cli.output.join("failures.csv");
    reporting::write_updates_file(&updates_path, &updates)
        .with_context(|| format!("writing {}", updates_path.display()))?;
    reporting::write_exceptions_file(&exceptions_path, repo.exceptions())
        .with_context(|| format!("writing {}", exceptions_path.display()))?;
    reporting::write_failures_file(&failures_path, &failures)
        .with_context(|| format!("writing {}", failures_path.display()))?;

    // 5. PRINT SUMMARY
    println!("\n=== Batch Summary ===");
    println!("Item updates committed: {}", updates.len());
    println!("Item failures: {}", failures.len());
    println!("Exceptions raised: {}", repo.exceptions().len());
    for id in population.iter().map(|s| s.record.item_id.as_str()) {
        if let Some(policy) = repo.get(id).and_then(|r| r.order_policy.as_ref()) {
            println!(
                "{id}: order every {} days, qty {:.1}, bracket {}, cost ${:.2}/yr",
                policy.order_cycle_days,
                policy.order_quantity,
                policy.bracket.number,
                policy.total_cost()
            );
        }
    }
    println!("Reports written to {}", cli.output.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let toml_str = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&toml_str).context("failed to parse engine TOML config")
}

/// An item with its pre-generated observation streams.
struct SyntheticItem {
    record: ItemRecord,
    demand: Vec<f64>,
    lead_times: Vec<f64>,
    fill_rates: Vec<f64>,
}

impl SyntheticItem {
    fn observation(&self, week: usize) -> PeriodObservation {
        let mut obs = PeriodObservation::new(self.record.item_id.clone());
        obs.demand = self.demand.get(week).copied();
        if week % RECEIPT_INTERVAL == 0 {
            obs.lead_time_days = self.lead_times.get(week / RECEIPT_INTERVAL).copied();
        }
        if week % FILL_RATE_INTERVAL == FILL_RATE_INTERVAL - 1 {
            obs.service_level_attained = self.fill_rates.get(week / FILL_RATE_INTERVAL).copied();
        }
        obs
    }
}

/// Builds a mixed population: steady, stepped and intermittent demand.
fn synthetic_population(
    rng: &mut StdRng,
    items: usize,
    periods: usize,
) -> Result<Vec<SyntheticItem>> {
    let mut population = Vec::with_capacity(items);
    for i in 0..items {
        let mean = rng.gen_range(20.0..200.0);
        let (method, demand) = match i % 3 {
            0 => (
                ForecastMethod::RegularAvs,
                demand::generate_normal_demand(rng, periods, mean, mean * 0.15)?,
            ),
            1 => (
                ForecastMethod::RegularAvs,
                demand::generate_step_demand(periods, periods / 3, mean, mean * 1.8),
            ),
            _ => (
                ForecastMethod::EnhancedAvs,
                demand::generate_intermittent_demand(rng, periods, 0.3, mean / 4.0, mean / 16.0)?,
            ),
        };

        let receipts = periods / RECEIPT_INTERVAL + 1;
        let mean_lead_time = rng.gen_range(5.0..30.0);
        let lead_times = demand::generate_lead_times(rng, receipts, mean_lead_time, 2.5)?;
        let fill_rates = (0..periods / FILL_RATE_INTERVAL + 1)
            .map(|_| rng.gen_range(85.0..100.0))
            .collect();

        // Even vendors publish a two-tier discount schedule
        let brackets = if i % 2 == 0 {
            let break_qty = (mean * 2.0).round();
            vec![
                Bracket::new(1, 0.0, None, 0.0),
                Bracket::new(2, break_qty, None, 5.0),
            ]
        } else {
            Vec::new()
        };

        let record = ItemRecord::new(
            format!("SKU-{:04}", i + 1),
            ItemMaster {
                purchase_price: rng.gen_range(2.0..50.0),
                order_cycle_days: 14,
                periodicity: 52,
                forecast_method: method,
                service_level_goal: None,
            },
            VendorTerms {
                vendor_id: format!("V-{:02}", i % 4 + 1),
                service_level_goal: Some(95.0),
                acquisition_cost_per_order: rng.gen_range(15.0..80.0),
                brackets,
            },
        );

        population.push(SyntheticItem {
            record,
            demand,
            lead_times,
            fill_rates,
        });
    }
    Ok(population)
}
