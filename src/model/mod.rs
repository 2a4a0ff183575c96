//! Plain per-item records exchanged with the persistence layer.
//!
//! None of these types carry behaviour beyond validation and small derived
//! quantities; all numeric work lives in the forecasting, safety-stock and
//! order-policy modules.

pub mod exception;
pub mod forecast;
pub mod item;
pub mod lead_time;
pub mod policy;
pub mod safety_stock;

pub use exception::{EvaluationPeriod, ExceptionKind, ExceptionRecord, ResolutionStatus};
pub use forecast::{ForecastMethod, ForecastState, SeasonalProfile};
pub use item::{ItemMaster, ItemRecord, VendorTerms};
pub use lead_time::{LeadTimeState, TrendDirection};
pub use policy::{Bracket, CostInputs, CycleCost, OrderPolicyResult};
pub use safety_stock::{ManualOverride, OverrideMode, SafetyStockState};
