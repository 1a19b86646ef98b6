use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    BillingError, CreateInvoiceRequest, Invoice, InvoiceItem, InvoiceListQuery, InvoiceStatus,
    RecordPaymentRequest,
};

pub struct InvoiceService {
    supabase: SupabaseClient,
}

impl InvoiceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Totals are computed here, never trusted from the caller.
    pub fn compute_totals(items: &[InvoiceItem], discount: f64) -> Result<(f64, f64)> {
        let subtotal: f64 = items.iter().map(|i| i.amount).sum();

        if discount < 0.0 {
            return Err(anyhow!(BillingError::Validation(
                "Discount cannot be negative".to_string()
            )));
        }
        if discount > subtotal {
            return Err(anyhow!(BillingError::Validation(
                "Discount cannot exceed the subtotal".to_string()
            )));
        }

        Ok((subtotal, subtotal - discount))
    }

    pub async fn create_invoice(
        &self,
        clinic_id: Uuid,
        request: CreateInvoiceRequest,
        auth_token: &str,
    ) -> Result<Invoice> {
        debug!("Creating invoice for patient {}", request.patient_id);

        if request.items.is_empty() {
            return Err(anyhow!(BillingError::Validation(
                "Invoice must have at least one item".to_string()
            )));
        }

        let items: Vec<InvoiceItem> = request
            .items
            .into_iter()
            .map(|item| {
                if item.quantity <= 0.0 || item.unit_price < 0.0 {
                    return Err(anyhow!(BillingError::Validation(format!(
                        "Invalid quantity or price on item '{}'",
                        item.description
                    ))));
                }
                Ok(InvoiceItem {
                    amount: item.quantity * item.unit_price,
                    description: item.description,
                    item_type: item.item_type,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let discount = request.discount.unwrap_or(0.0);
        let (subtotal, total) = Self::compute_totals(&items, discount)?;

        let invoice_number = self.next_invoice_number(clinic_id, auth_token).await?;

        let invoice_data = json!({
            "clinic_id": clinic_id,
            "patient_id": request.patient_id,
            "consultation_id": request.consultation_id,
            "invoice_number": invoice_number,
            "items": items,
            "subtotal": subtotal,
            "discount": discount,
            "total": total,
            "status": InvoiceStatus::Unpaid,
            "panel_id": request.panel_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/invoices",
                Some(auth_token),
                Some(invoice_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create invoice"));
        }

        let invoice: Invoice = serde_json::from_value(result[0].clone())?;
        info!("Invoice {} created, total {:.2}", invoice.invoice_number, invoice.total);

        Ok(invoice)
    }

    async fn next_invoice_number(&self, clinic_id: Uuid, auth_token: &str) -> Result<String> {
        let year = Utc::now().format("%Y");
        let count_path = format!(
            "/rest/v1/invoices?clinic_id=eq.{}&select=id&invoice_number=like.INV-{}-*",
            clinic_id, year
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &count_path, Some(auth_token), None)
            .await?;

        Ok(format!("INV-{}-{:04}", year, existing.len() + 1))
    }

    pub async fn get_invoice(
        &self,
        clinic_id: Uuid,
        invoice_id: &str,
        auth_token: &str,
    ) -> Result<Invoice> {
        let path = format!(
            "/rest/v1/invoices?id=eq.{}&clinic_id=eq.{}",
            invoice_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!(BillingError::InvoiceNotFound));
        }

        let invoice: Invoice = serde_json::from_value(result[0].clone())?;
        Ok(invoice)
    }

    pub async fn list_invoices(
        &self,
        clinic_id: Uuid,
        query: InvoiceListQuery,
        auth_token: &str,
    ) -> Result<Vec<Invoice>> {
        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/invoices?{}&order=created_at.desc&limit={}&offset={}",
            query_parts.join("&"),
            limit,
            offset
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let invoices: Vec<Invoice> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(invoices)
    }

    pub async fn record_payment(
        &self,
        clinic_id: Uuid,
        invoice_id: &str,
        request: RecordPaymentRequest,
        auth_token: &str,
    ) -> Result<Invoice> {
        let invoice = self.get_invoice(clinic_id, invoice_id, auth_token).await?;

        if invoice.status == InvoiceStatus::Void {
            return Err(anyhow!(BillingError::Validation(
                "Cannot record payment on a void invoice".to_string()
            )));
        }
        if invoice.status == InvoiceStatus::Paid {
            return Err(anyhow!(BillingError::Validation(
                "Invoice is already fully paid".to_string()
            )));
        }
        if request.amount <= 0.0 || request.amount > invoice.total {
            return Err(anyhow!(BillingError::Validation(
                "Payment must be positive and no more than the invoice total".to_string()
            )));
        }

        let fully_paid = request.amount >= invoice.total;
        let new_status = if fully_paid {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(new_status));
        update_data.insert("payment_method".to_string(), json!(request.payment_method));
        if fully_paid {
            update_data.insert("paid_at".to_string(), json!(Utc::now().to_rfc3339()));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/invoices?id=eq.{}&clinic_id=eq.{}",
            invoice_id, clinic_id
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
            return Err(anyhow!("Failed to record payment"));
        }

        let updated: Invoice = serde_json::from_value(result[0].clone())?;
        info!(
            "Payment of {:.2} recorded on invoice {} ({})",
            request.amount, updated.invoice_number, updated.status
        );
        Ok(updated)
    }

    pub async fn void_invoice(
        &self,
        clinic_id: Uuid,
        invoice_id: &str,
        auth_token: &str,
    ) -> Result<Invoice> {
        let invoice = self.get_invoice(clinic_id, invoice_id, auth_token).await?;

        if invoice.status == InvoiceStatus::Paid {
            return Err(anyhow!(BillingError::Validation(
                "Cannot void a paid invoice".to_string()
            )));
        }

        let update_data = json!({
            "status": InvoiceStatus::Void,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/invoices?id=eq.{}&clinic_id=eq.{}",
            invoice_id, clinic_id
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
            return Err(anyhow!("Failed to void invoice"));
        }

        let updated: Invoice = serde_json::from_value(result[0].clone())?;
        info!("Invoice {} voided", updated.invoice_number);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceItemType;

    fn item(quantity: f64, unit_price: f64) -> InvoiceItem {
        InvoiceItem {
            description: "item".to_string(),
            item_type: InvoiceItemType::Other,
            quantity,
            unit_price,
            amount: quantity * unit_price,
        }
    }

    #[test]
    fn totals_sum_line_amounts() {
        let items = vec![item(2.0, 10.0), item(1.0, 35.0)];
        let (subtotal, total) = InvoiceService::compute_totals(&items, 5.0).unwrap();
        assert_eq!(subtotal, 55.0);
        assert_eq!(total, 50.0);
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let items = vec![item(1.0, 20.0)];
        assert!(InvoiceService::compute_totals(&items, 25.0).is_err());
        assert!(InvoiceService::compute_totals(&items, -1.0).is_err());
    }
}
