// src/policy.rs

//! Order policy analysis.
//!
//! Bracket discounts make total cost a non-convex, discontinuous function of
//! the order cycle, so the analyzer searches a discrete candidate set rather
//! than solving for a stationary point:
//!
//! - every review interval on the configured grid, and
//! - the cycle implied by each bracket's minimum quantity.
//!
//! For each candidate the order quantity picks its bracket, the bracket's
//! discount lowers the unit value carried, and the cheapest total
//! (acquisition + carrying) wins. Ties go to the shorter cycle.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{ensure_non_negative, ensure_positive, ReplenishError, Result};
use crate::model::{Bracket, CostInputs, CycleCost, OrderPolicyResult};

/// Classic economic order quantity, in units.
///
/// `annual_demand` in units, `order_cost` per order, `carrying_cost_rate` as
/// an annual fraction of `unit_cost`. Returns 0 when demand or carrying cost
/// is zero.
pub fn economic_order_quantity(
    annual_demand: f64,
    order_cost: f64,
    carrying_cost_rate: f64,
    unit_cost: f64,
) -> f64 {
    let holding = carrying_cost_rate * unit_cost;
    if annual_demand <= 0.0 || holding <= 0.0 {
        return 0.0;
    }
    ((2.0 * annual_demand * order_cost) / holding).sqrt()
}

#[derive(Debug, Clone, Copy)]
pub struct OrderPolicyAnalyzer<'a> {
    config: &'a EngineConfig,
}

impl<'a> OrderPolicyAnalyzer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Candidate cycles: the review grid plus bracket-implied cycles that
    /// fall within the grid's bounds.
    pub fn candidate_cycles(&self, demand_rate: f64, brackets: &[Bracket]) -> BTreeSet<u32> {
        let cfg = self.config;
        let mut cycles: BTreeSet<u32> = (cfg.min_cycle_days..=cfg.max_cycle_days)
            .step_by(cfg.cycle_step_days.max(1) as usize)
            .collect();

        if demand_rate > 0.0 {
            for bracket in brackets {
                let implied = (bracket.min_quantity / demand_rate).ceil();
                let bounds = f64::from(cfg.min_cycle_days)..=f64::from(cfg.max_cycle_days);
                if bounds.contains(&implied) {
                    cycles.insert(implied as u32);
                }
            }
        }
        cycles
    }

    /// The bracket an order quantity falls into.
    ///
    /// When several overlap, the one with the highest minimum wins. A vendor
    /// without brackets gets the undiscounted bracket.
    pub fn bracket_for(&self, quantity: f64, brackets: &[Bracket]) -> Option<Bracket> {
        if brackets.is_empty() {
            return Some(Bracket::undiscounted());
        }
        brackets
            .iter()
            .filter(|b| b.contains(quantity))
            .max_by(|a, b| a.min_quantity.total_cmp(&b.min_quantity))
            .cloned()
    }

    /// Annualised cost of ordering every `cycle_days`.
    ///
    /// Returns `None` when the implied quantity fits no bracket.
    pub fn cycle_cost(
        &self,
        inputs: &CostInputs,
        cycle_days: u32,
        brackets: &[Bracket],
    ) -> Option<CycleCost> {
        let cycle = f64::from(cycle_days);
        let order_quantity = inputs.demand_rate * cycle;
        let bracket = self.bracket_for(order_quantity, brackets)?;

        let orders_per_year = self.config.days_per_year / cycle;
        let effective_unit_cost = bracket.effective_unit_cost(inputs.unit_cost);
        let average_inventory = order_quantity / 2.0 + inputs.safety_stock_units;

        Some(CycleCost {
            cycle_days,
            order_quantity,
            bracket_number: bracket.number,
            effective_unit_cost,
            acquisition_cost: inputs.acquisition_cost_per_order * orders_per_year,
            carrying_cost: average_inventory * effective_unit_cost * inputs.carrying_cost_rate,
        })
    }

    /// Simulates every candidate cycle and returns the cheapest policy.
    pub fn evaluate(
        &self,
        inputs: &CostInputs,
        vendor_brackets: &[Bracket],
    ) -> Result<OrderPolicyResult> {
        ensure_non_negative("demand rate", inputs.demand_rate)?;
        ensure_non_negative("acquisition cost", inputs.acquisition_cost_per_order)?;
        ensure_non_negative("carrying cost rate", inputs.carrying_cost_rate)?;
        ensure_positive("unit cost", inputs.unit_cost)?;
        ensure_non_negative("safety stock units", inputs.safety_stock_units)?;
        for b in vendor_brackets {
            validate_bracket(b)?;
        }

        let candidates: Vec<CycleCost> = self
            .candidate_cycles(inputs.demand_rate, vendor_brackets)
            .into_iter()
            .filter_map(|cycle| self.cycle_cost(inputs, cycle, vendor_brackets))
            .collect();

        // Ascending cycle order plus strict comparison keeps the shorter
        // cycle on ties
        let mut best: Option<&CycleCost> = None;
        for c in &candidates {
            if best.map_or(true, |b| c.total_cost() < b.total_cost()) {
                best = Some(c);
            }
        }
        let best = best.cloned().ok_or_else(|| {
            ReplenishError::computation("no candidate cycle fits any vendor bracket")
        })?;

        let bracket = self
            .bracket_for(best.order_quantity, vendor_brackets)
            .ok_or_else(|| ReplenishError::computation("chosen cycle lost its bracket"))?;

        debug!(
            cycle = best.cycle_days,
            quantity = best.order_quantity,
            bracket = bracket.number,
            total = best.total_cost(),
            "order policy selected"
        );

        Ok(OrderPolicyResult {
            order_cycle_days: best.cycle_days,
            order_quantity: best.order_quantity,
            total_acquisition_cost: best.acquisition_cost,
            total_carrying_cost: best.carrying_cost,
            bracket,
            candidates,
        })
    }
}

fn validate_bracket(b: &Bracket) -> Result<()> {
    ensure_non_negative("bracket minimum", b.min_quantity)?;
    if let Some(max) = b.max_quantity {
        ensure_non_negative("bracket maximum", max)?;
        if max < b.min_quantity {
            return Err(ReplenishError::validation(format!(
                "bracket {} maximum {max} below minimum {}",
                b.number, b.min_quantity
            )));
        }
    }
    if !(0.0..100.0).contains(&b.discount_pct) {
        return Err(ReplenishError::validation(format!(
            "bracket {} discount must be in [0, 100), got {}",
            b.number, b.discount_pct
        )));
    }
    Ok(())
}
