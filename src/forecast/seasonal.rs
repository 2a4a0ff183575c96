//! Seasonal profile construction from multi-year demand history.

use crate::error::{ensure_non_negative, ReplenishError, Result};
use crate::model::SeasonalProfile;

/// Years of history considered when building a composite line.
pub const MAX_PROFILE_YEARS: usize = 4;

/// Indices are floored here before normalisation so a dead period never
/// yields a zero divisor when deseasonalising.
const MIN_SEASONAL_INDEX: f64 = 0.05;

/// Weighted per-period average over the most recent years.
///
/// `years` is ordered most recent first. The most recent year carries
/// `recent_weight`; older years share the remainder with weights decaying as
/// `exp(-0.5 * (i - 1))`. Years shorter than the first contribute only to the
/// periods they cover.
pub fn composite_line(years: &[Vec<f64>], recent_weight: f64) -> Vec<f64> {
    let used = &years[..years.len().min(MAX_PROFILE_YEARS)];
    let Some(first) = used.first() else {
        return Vec::new();
    };

    let remaining = 1.0 - recent_weight;
    let weights: Vec<f64> = (0..used.len())
        .map(|i| {
            if i == 0 {
                recent_weight
            } else {
                remaining * (-0.5 * (i as f64 - 1.0)).exp()
            }
        })
        .collect();

    (0..first.len())
        .map(|period| {
            let mut weighted = 0.0;
            let mut weight_sum = 0.0;
            for (year, w) in used.iter().zip(&weights) {
                if let Some(v) = year.get(period) {
                    weighted += v * w;
                    weight_sum += w;
                }
            }
            if weight_sum > 0.0 {
                weighted / weight_sum
            } else {
                0.0
            }
        })
        .collect()
}

/// Turns a composite line into indices averaging 1.0.
///
/// Each raw index is blended with its circular neighbours by `smoothing`
/// (0 disables blending).
pub fn seasonal_indices(composite: &[f64], smoothing: f64) -> Vec<f64> {
    let n = composite.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = composite.iter().sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return vec![1.0; n];
    }

    let raw: Vec<f64> = composite.iter().map(|v| v / mean).collect();
    let smoothed: Vec<f64> = if smoothing > 0.0 {
        (0..n)
            .map(|i| {
                let prev = raw[(i + n - 1) % n];
                let next = raw[(i + 1) % n];
                raw[i] * (1.0 - smoothing) + (prev + next) * (smoothing / 2.0)
            })
            .collect()
    } else {
        raw
    };

    let floored: Vec<f64> = smoothed.iter().map(|v| v.max(MIN_SEASONAL_INDEX)).collect();
    let sum: f64 = floored.iter().sum();
    floored.iter().map(|v| v * n as f64 / sum).collect()
}

/// Builds a seasonal profile from yearly history, most recent year first.
pub fn build_profile(
    id: impl Into<String>,
    years: &[Vec<f64>],
    recent_weight: f64,
    smoothing: f64,
) -> Result<SeasonalProfile> {
    if !(0.0..=1.0).contains(&recent_weight) {
        return Err(ReplenishError::validation(format!(
            "recent_weight must be in 0..=1, got {recent_weight}"
        )));
    }
    if !(0.0..=1.0).contains(&smoothing) {
        return Err(ReplenishError::validation(format!(
            "smoothing must be in 0..=1, got {smoothing}"
        )));
    }
    for v in years.iter().flatten() {
        ensure_non_negative("seasonal history value", *v)?;
    }

    let composite = composite_line(years, recent_weight);
    SeasonalProfile::new(id, seasonal_indices(&composite, smoothing))
}
