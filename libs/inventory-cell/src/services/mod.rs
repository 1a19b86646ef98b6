pub mod costing;
pub mod medication;

pub use costing::{recompute_cost_history, CostRecalculation};
pub use medication::MedicationService;
