// src/io/reporting.rs

use std::io;
use std::path::Path;

use serde::Serialize;

use crate::batch::{ItemFailure, ItemUpdate};
use crate::model::{ExceptionKind, ExceptionRecord, ResolutionStatus};

/// One CSV row per committed item update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRow<'a> {
    pub item_id: &'a str,
    pub date: String,
    pub period_of_year: u16,
    pub demand_level: f64,
    pub next_forecast: f64,
    pub forecast_error: Option<f64>,
    pub madp: f64,
    pub tracking_signal: f64,
    pub lead_time_forecast: f64,
    pub lead_time_variance: f64,
    pub safety_stock_days: f64,
    pub safety_stock_units: f64,
    pub order_cycle_days: u32,
    pub order_quantity: f64,
    pub bracket: u32,
    pub total_cost: f64,
    pub exceptions: usize,
}

impl<'a> From<&'a ItemUpdate> for UpdateRow<'a> {
    fn from(u: &'a ItemUpdate) -> Self {
        Self {
            item_id: &u.item_id,
            date: u.period.date.to_string(),
            period_of_year: u.period.period_of_year,
            demand_level: u.forecast.demand_level,
            next_forecast: u.next_forecast,
            forecast_error: u.forecast_error,
            madp: u.forecast.madp,
            tracking_signal: u.forecast.tracking_signal,
            lead_time_forecast: u.lead_time.lead_time_forecast,
            lead_time_variance: u.lead_time.lead_time_variance,
            safety_stock_days: u.safety_stock.safety_stock_days,
            safety_stock_units: u.safety_stock.safety_stock_units,
            order_cycle_days: u.order_policy.order_cycle_days,
            order_quantity: u.order_policy.order_quantity,
            bracket: u.order_policy.bracket.number,
            total_cost: u.order_policy.total_cost(),
            exceptions: u.exceptions.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ExceptionRow<'a> {
    item_id: &'a str,
    kind: ExceptionKind,
    detected_at: String,
    period_of_year: u16,
    value: f64,
    threshold: f64,
    resolution_status: ResolutionStatus,
}

/// Writes item updates as CSV to any writer.
pub fn write_updates<W: io::Write>(writer: W, updates: &[ItemUpdate]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for u in updates {
        wtr.serialize(UpdateRow::from(u))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes exception records as CSV to any writer.
pub fn write_exceptions<W: io::Write>(
    writer: W,
    exceptions: &[ExceptionRecord],
) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for e in exceptions {
        wtr.serialize(ExceptionRow {
            item_id: &e.item_id,
            kind: e.kind,
            detected_at: e.detected_at.to_string(),
            period_of_year: e.period_of_year,
            value: e.value,
            threshold: e.threshold,
            resolution_status: e.resolution_status,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the batch failure list as CSV to any writer.
pub fn write_failures<W: io::Write>(writer: W, failures: &[ItemFailure]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for f in failures {
        wtr.serialize(f)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the item updates to a CSV file.
///
/// # Arguments
/// * `path` - Where to save the file (e.g., "out/updates.csv").
/// * `updates` - Updates committed by the batch run.
pub fn write_updates_file(path: impl AsRef<Path>, updates: &[ItemUpdate]) -> csv::Result<()> {
    let file = std::fs::File::create(path)?;
    write_updates(file, updates)
}

pub fn write_exceptions_file(
    path: impl AsRef<Path>,
    exceptions: &[ExceptionRecord],
) -> csv::Result<()> {
    let file = std::fs::File::create(path)?;
    write_exceptions(file, exceptions)
}

pub fn write_failures_file(path: impl AsRef<Path>, failures: &[ItemFailure]) -> csv::Result<()> {
    let file = std::fs::File::create(path)?;
    write_failures(file, failures)
}
