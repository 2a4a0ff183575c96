// src/model/item.rs

use serde::{Deserialize, Serialize};

use crate::model::forecast::{ForecastMethod, ForecastState, SeasonalProfile};
use crate::model::lead_time::LeadTimeState;
use crate::model::policy::{Bracket, OrderPolicyResult};
use crate::model::safety_stock::SafetyStockState;

/// Item master attributes supplied by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMaster {
    pub purchase_price: f64,
    /// Default order cycle used until an order policy has been chosen.
    pub order_cycle_days: u32,
    pub periodicity: u16,
    pub forecast_method: ForecastMethod,
    /// Item-level goal; overrides the vendor and company goals.
    pub service_level_goal: Option<f64>,
}

/// Vendor attributes relevant to replenishment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorTerms {
    pub vendor_id: String,
    pub service_level_goal: Option<f64>,
    pub acquisition_cost_per_order: f64,
    pub brackets: Vec<Bracket>,
}

/// Everything the engine knows about one item at the start of a run.
///
/// State fields are `None` until the item's first observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub item_id: String,
    pub master: ItemMaster,
    pub vendor: VendorTerms,

    pub forecast: Option<ForecastState>,
    pub lead_time: Option<LeadTimeState>,
    pub safety_stock: Option<SafetyStockState>,
    pub seasonal_profile: Option<SeasonalProfile>,
    pub order_policy: Option<OrderPolicyResult>,
}

impl ItemRecord {
    /// Constructor for an item that has never been observed.
    pub fn new(item_id: impl Into<String>, master: ItemMaster, vendor: VendorTerms) -> Self {
        Self {
            item_id: item_id.into(),
            master,
            vendor,
            forecast: None,
            lead_time: None,
            safety_stock: None,
            seasonal_profile: None,
            order_policy: None,
        }
    }

    /// The order cycle currently in force: the last recommendation, else the
    /// master default.
    pub fn current_order_cycle_days(&self) -> u32 {
        self.order_policy
            .as_ref()
            .map_or(self.master.order_cycle_days, |p| p.order_cycle_days)
    }
}
