// src/model/exception.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The evaluation period every output is stamped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationPeriod {
    pub date: NaiveDate,
    /// 1-based period within the year.
    pub period_of_year: u16,
}

impl EvaluationPeriod {
    pub fn new(date: NaiveDate, period_of_year: u16) -> Self {
        Self {
            date,
            period_of_year,
        }
    }

    /// The period that follows this one, wrapping at `periodicity`.
    pub fn next_period_of_year(&self, periodicity: u16) -> u16 {
        if periodicity == 0 {
            return 1;
        }
        self.period_of_year % periodicity + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    DemandSpike,
    TrackingSignalBreach,
    ServiceLevelBreach,
    LeadTimeVarianceBreach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    Open,
    AutoResolved,
    ManuallyResolved,
}

/// An item flagged for buyer attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub item_id: String,
    pub kind: ExceptionKind,
    pub detected_at: NaiveDate,
    pub period_of_year: u16,
    /// Measured value that breached the threshold.
    pub value: f64,
    pub threshold: f64,
    pub resolution_status: ResolutionStatus,
}

impl ExceptionRecord {
    pub fn open(
        item_id: &str,
        kind: ExceptionKind,
        period: EvaluationPeriod,
        value: f64,
        threshold: f64,
    ) -> Self {
        Self {
            item_id: item_id.to_string(),
            kind,
            detected_at: period.date,
            period_of_year: period.period_of_year,
            value,
            threshold,
            resolution_status: ResolutionStatus::Open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_period_wraps() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 28).unwrap();
        assert_eq!(EvaluationPeriod::new(date, 52).next_period_of_year(52), 1);
        assert_eq!(EvaluationPeriod::new(date, 3).next_period_of_year(12), 4);
    }

    #[test]
    fn records_open() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let r = ExceptionRecord::open(
            "SKU-1",
            ExceptionKind::DemandSpike,
            EvaluationPeriod::new(date, 9),
            42.0,
            3.0,
        );
        assert_eq!(r.resolution_status, ResolutionStatus::Open);
        assert_eq!(r.detected_at, date);
        assert_eq!(r.period_of_year, 9);
    }
}
