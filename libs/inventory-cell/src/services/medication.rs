use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    AdjustStockRequest, CreateMedicationRequest, InventoryError, Medication, ReceiveStockRequest,
    StockReceipt, UpdateMedicationRequest,
};
use crate::services::costing::{self, CostRecalculation};

pub struct MedicationService {
    supabase: SupabaseClient,
}

impl MedicationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_medication(
        &self,
        clinic_id: Uuid,
        request: CreateMedicationRequest,
        auth_token: &str,
    ) -> Result<Medication> {
        debug!("Creating medication '{}' for clinic {}", request.name, clinic_id);

        if request.selling_price < 0.0 {
            return Err(anyhow!(InventoryError::Validation(
                "Selling price cannot be negative".to_string()
            )));
        }

        let medication_data = json!({
            "clinic_id": clinic_id,
            "name": request.name,
            "unit": request.unit,
            "stock_on_hand": 0.0,
            "average_cost": 0.0,
            "selling_price": request.selling_price,
            "reorder_level": request.reorder_level.unwrap_or(0.0),
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/medications",
                Some(auth_token),
                Some(medication_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create medication"));
        }

        let medication: Medication = serde_json::from_value(result[0].clone())?;
        info!("Medication {} created", medication.id);

        Ok(medication)
    }

    pub async fn get_medication(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        auth_token: &str,
    ) -> Result<Medication> {
        let path = format!(
            "/rest/v1/medications?id=eq.{}&clinic_id=eq.{}",
            medication_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!(InventoryError::NotFound));
        }

        let medication: Medication = serde_json::from_value(result[0].clone())?;
        Ok(medication)
    }

    pub async fn list_medications(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Medication>> {
        let path = format!(
            "/rest/v1/medications?clinic_id=eq.{}&order=name.asc",
            clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let medications: Vec<Medication> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(medications)
    }

    pub async fn update_medication(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        request: UpdateMedicationRequest,
        auth_token: &str,
    ) -> Result<Medication> {
        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(unit) = request.unit {
            update_data.insert("unit".to_string(), json!(unit));
        }
        if let Some(selling_price) = request.selling_price {
            update_data.insert("selling_price".to_string(), json!(selling_price));
        }
        if let Some(reorder_level) = request.reorder_level {
            update_data.insert("reorder_level".to_string(), json!(reorder_level));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/medications?id=eq.{}&clinic_id=eq.{}",
            medication_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update medication"));
        }

        let medication: Medication = serde_json::from_value(result[0].clone())?;
        Ok(medication)
    }

    /// Record a stock receipt and advance the moving average by one step.
    pub async fn receive_stock(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        request: ReceiveStockRequest,
        auth_token: &str,
    ) -> Result<Medication> {
        if request.quantity <= 0.0 {
            return Err(anyhow!(InventoryError::Validation(
                "Receipt quantity must be positive".to_string()
            )));
        }
        if request.unit_cost < 0.0 {
            return Err(anyhow!(InventoryError::Validation(
                "Unit cost cannot be negative".to_string()
            )));
        }

        let medication = self
            .get_medication(clinic_id, medication_id, auth_token)
            .await?;

        let receipt_data = json!({
            "medication_id": medication.id,
            "quantity": request.quantity,
            "unit_cost": request.unit_cost,
            "supplier": request.supplier,
            "reference": request.reference,
            "received_at": Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/stock_receipts",
                Some(auth_token),
                Some(receipt_data),
                Some(return_representation()),
            )
            .await?;

        let (new_stock, new_average) = costing::apply_receipt(
            medication.stock_on_hand,
            medication.average_cost,
            request.quantity,
            request.unit_cost,
        );

        self.persist_stock_state(clinic_id, medication_id, new_stock, new_average, auth_token)
            .await
    }

    /// Dispensing or manual correction. Stock never goes below zero.
    pub async fn adjust_stock(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        request: AdjustStockRequest,
        auth_token: &str,
    ) -> Result<Medication> {
        let medication = self
            .get_medication(clinic_id, medication_id, auth_token)
            .await?;

        let new_stock = medication.stock_on_hand + request.quantity_delta;
        if new_stock < 0.0 {
            return Err(anyhow!(InventoryError::InsufficientStock {
                on_hand: medication.stock_on_hand,
                requested: -request.quantity_delta,
            }));
        }

        self.persist_stock_state(
            clinic_id,
            medication_id,
            new_stock,
            medication.average_cost,
            auth_token,
        )
        .await
    }

    /// Refetch the full receipt history in order and recompute stock and
    /// average from scratch. Used after backdated receipt edits.
    pub async fn recalculate_costs(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        auth_token: &str,
    ) -> Result<CostRecalculation> {
        let medication = self
            .get_medication(clinic_id, medication_id, auth_token)
            .await?;

        let receipts = self.fetch_receipts(&medication.id, auth_token).await?;
        let recalculation = costing::recompute_cost_history(&receipts);

        self.persist_stock_state(
            clinic_id,
            medication_id,
            recalculation.stock_on_hand,
            recalculation.average_cost,
            auth_token,
        )
        .await?;

        info!(
            "Recalculated costs for medication {}: stock {}, average {:.4}",
            medication_id, recalculation.stock_on_hand, recalculation.average_cost
        );

        Ok(recalculation)
    }

    pub async fn cost_history(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        auth_token: &str,
    ) -> Result<CostRecalculation> {
        let medication = self
            .get_medication(clinic_id, medication_id, auth_token)
            .await?;

        let receipts = self.fetch_receipts(&medication.id, auth_token).await?;
        Ok(costing::recompute_cost_history(&receipts))
    }

    pub async fn low_stock_report(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Medication>> {
        let medications = self.list_medications(clinic_id, auth_token).await?;
        Ok(medications
            .into_iter()
            .filter(|m| m.is_low_stock())
            .collect())
    }

    async fn fetch_receipts(
        &self,
        medication_id: &Uuid,
        auth_token: &str,
    ) -> Result<Vec<StockReceipt>> {
        let path = format!(
            "/rest/v1/stock_receipts?medication_id=eq.{}&order=received_at.asc",
            medication_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let receipts: Vec<StockReceipt> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(receipts)
    }

    async fn persist_stock_state(
        &self,
        clinic_id: Uuid,
        medication_id: &str,
        stock_on_hand: f64,
        average_cost: f64,
        auth_token: &str,
    ) -> Result<Medication> {
        let update_data = json!({
            "stock_on_hand": stock_on_hand,
            "average_cost": average_cost,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/medications?id=eq.{}&clinic_id=eq.{}",
            medication_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update medication stock"));
        }

        let medication: Medication = serde_json::from_value(result[0].clone())?;
        Ok(medication)
    }
}
