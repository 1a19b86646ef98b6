use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    /// Dispensing unit: tablet, bottle, ampoule, ...
    pub unit: String,
    pub stock_on_hand: f64,
    pub average_cost: f64,
    pub selling_price: f64,
    pub reorder_level: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medication {
    pub fn is_low_stock(&self) -> bool {
        self.stock_on_hand <= self.reorder_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReceipt {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub quantity: f64,
    pub unit_cost: f64,
    pub supplier: Option<String>,
    pub reference: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// One step of the recomputed cost history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostHistoryPoint {
    pub receipt_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub quantity: f64,
    pub unit_cost: f64,
    pub stock_after: f64,
    pub average_cost_after: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub unit: String,
    pub selling_price: f64,
    pub reorder_level: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMedicationRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub selling_price: Option<f64>,
    pub reorder_level: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveStockRequest {
    pub quantity: f64,
    pub unit_cost: f64,
    pub supplier: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    /// Negative for dispensing, positive for corrections.
    pub quantity_delta: f64,
    pub reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Medication not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stock cannot go below zero (on hand: {on_hand}, requested: {requested})")]
    InsufficientStock { on_hand: f64, requested: f64 },

    #[error("Database error: {0}")]
    Database(String),
}
