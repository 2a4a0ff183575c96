// src/io/demand.rs

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{ReplenishError, Result};

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| {
        ReplenishError::validation(format!("invalid normal({mean}, {std_dev}): {e}"))
    })
}

/// Generates a demand stream where every period has the exact same amount.
/// Useful for convergence tests.
pub fn generate_constant_demand(periods: usize, value: f64) -> Vec<f64> {
    vec![value; periods]
}

/// Generates demand from a Normal distribution, rounded to whole units.
///
/// # Arguments
/// * `periods` - Length of the stream.
/// * `mean` - The average demand per period (e.g., 100.0).
/// * `std_dev` - The standard deviation (volatility) (e.g., 15.0).
pub fn generate_normal_demand<R: Rng + ?Sized>(
    rng: &mut R,
    periods: usize,
    mean: f64,
    std_dev: f64,
) -> Result<Vec<f64>> {
    let dist = normal(mean, std_dev)?;
    // Demand cannot be negative
    Ok((0..periods)
        .map(|_| dist.sample(rng).round().max(0.0))
        .collect())
}

/// Generates a step pattern: `before` for the first `step_at` periods, then
/// `after`. Sustained one-sided error like this is what trips the tracking
/// signal.
pub fn generate_step_demand(periods: usize, step_at: usize, before: f64, after: f64) -> Vec<f64> {
    (0..periods)
        .map(|p| if p < step_at { before } else { after })
        .collect()
}

/// Generates slow-moving demand: each period has a `probability` chance of
/// an order whose size is drawn from Normal(`mean_size`, `size_std_dev`).
pub fn generate_intermittent_demand<R: Rng + ?Sized>(
    rng: &mut R,
    periods: usize,
    probability: f64,
    mean_size: f64,
    size_std_dev: f64,
) -> Result<Vec<f64>> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(ReplenishError::validation(format!(
            "occurrence probability must be in 0..=1, got {probability}"
        )));
    }
    let size = normal(mean_size, size_std_dev)?;

    let mut schedule = Vec::with_capacity(periods);
    for _ in 0..periods {
        if rng.gen_bool(probability) {
            // An occurrence is always at least one unit
            schedule.push(size.sample(rng).round().max(1.0));
        } else {
            schedule.push(0.0);
        }
    }
    Ok(schedule)
}

/// Generates observed receipt lead times in whole days, never below one.
pub fn generate_lead_times<R: Rng + ?Sized>(
    rng: &mut R,
    receipts: usize,
    mean_days: f64,
    std_dev_days: f64,
) -> Result<Vec<f64>> {
    let dist = normal(mean_days, std_dev_days)?;
    Ok((0..receipts)
        .map(|_| dist.sample(rng).round().max(1.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn step_switches_level() {
        let s = generate_step_demand(6, 2, 4.0, 8.0);
        assert_eq!(s, vec![4.0, 4.0, 8.0, 8.0, 8.0, 8.0]);
    }

    #[test]
    fn normal_demand_is_non_negative_and_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let x = generate_normal_demand(&mut a, 200, 5.0, 10.0).unwrap();
        let y = generate_normal_demand(&mut b, 200, 5.0, 10.0).unwrap();
        assert_eq!(x, y);
        assert!(x.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn intermittent_has_gaps() {
        let mut rng = StdRng::seed_from_u64(11);
        let s = generate_intermittent_demand(&mut rng, 500, 0.2, 6.0, 2.0).unwrap();
        let zeros = s.iter().filter(|v| **v == 0.0).count();
        assert!(zeros > 300 && zeros < 500);
        assert!(s.iter().all(|v| *v == 0.0 || *v >= 1.0));
        assert!(generate_intermittent_demand(&mut rng, 5, 1.5, 6.0, 2.0).is_err());
    }

    #[test]
    fn lead_times_at_least_one_day() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = generate_lead_times(&mut rng, 100, 2.0, 5.0).unwrap();
        assert!(s.iter().all(|v| *v >= 1.0));
        assert!(generate_lead_times(&mut rng, 1, 2.0, -1.0).is_err());
    }
}
