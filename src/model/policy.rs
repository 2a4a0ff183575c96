// src/model/policy.rs

use serde::{Deserialize, Serialize};

/// A vendor order-quantity tier with its unit-cost discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub number: u32,
    /// Smallest order quantity (units) that qualifies.
    pub min_quantity: f64,
    /// Largest qualifying quantity; `None` means unbounded.
    pub max_quantity: Option<f64>,
    /// Discount off the base unit cost, in percent.
    pub discount_pct: f64,
}

impl Bracket {
    pub fn new(
        number: u32,
        min_quantity: f64,
        max_quantity: Option<f64>,
        discount_pct: f64,
    ) -> Self {
        Self {
            number,
            min_quantity,
            max_quantity,
            discount_pct,
        }
    }

    /// Bracket applied when a vendor publishes no schedule.
    pub fn undiscounted() -> Self {
        Self::new(0, 0.0, None, 0.0)
    }

    pub fn contains(&self, quantity: f64) -> bool {
        quantity >= self.min_quantity && self.max_quantity.map_or(true, |max| quantity <= max)
    }

    pub fn effective_unit_cost(&self, unit_cost: f64) -> f64 {
        unit_cost * (1.0 - self.discount_pct / 100.0)
    }
}

/// Cost parameters of one order-policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostInputs {
    /// Forecast demand in units per day.
    pub demand_rate: f64,
    /// Cost of placing one order.
    pub acquisition_cost_per_order: f64,
    /// Annual carrying cost as a fraction of inventory value.
    pub carrying_cost_rate: f64,
    /// Undiscounted purchase price per unit.
    pub unit_cost: f64,
    /// Safety stock held on top of cycle stock.
    pub safety_stock_units: f64,
}

/// Annualised cost of ordering on one candidate cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleCost {
    pub cycle_days: u32,
    pub order_quantity: f64,
    pub bracket_number: u32,
    pub effective_unit_cost: f64,
    pub acquisition_cost: f64,
    pub carrying_cost: f64,
}

impl CycleCost {
    pub fn total_cost(&self) -> f64 {
        self.acquisition_cost + self.carrying_cost
    }
}

/// The recommended order policy for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPolicyResult {
    pub order_cycle_days: u32,
    pub order_quantity: f64,
    pub total_acquisition_cost: f64,
    pub total_carrying_cost: f64,
    pub bracket: Bracket,
    /// Every feasible candidate, in ascending cycle order.
    #[serde(default)]
    pub candidates: Vec<CycleCost>,
}

impl OrderPolicyResult {
    pub fn total_cost(&self) -> f64 {
        self.total_acquisition_cost + self.total_carrying_cost
    }
}
