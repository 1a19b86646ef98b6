use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    BillingError, ClaimListQuery, ClaimStatus, CreateClaimRequest, Invoice, PanelClaim,
    TransitionClaimRequest,
};

/// Legal next statuses for a claim. A fixed adjacency table: legality is
/// a membership lookup, nothing else.
pub fn valid_transitions(current: ClaimStatus) -> &'static [ClaimStatus] {
    use ClaimStatus::*;
    match current {
        Draft => &[Submitted, Rejected],
        Submitted => &[Approved, ShortPaid, Rejected, Paid],
        Approved => &[Paid, ShortPaid],
        // A short-paid claim is either settled for the balance or
        // resubmitted to chase it.
        ShortPaid => &[Paid, Submitted],
        Rejected => &[Draft, Submitted],
        Paid => &[],
    }
}

pub fn can_transition(from: ClaimStatus, to: ClaimStatus) -> bool {
    valid_transitions(from).contains(&to)
}

pub struct ClaimService {
    supabase: SupabaseClient,
}

impl ClaimService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Draft a claim from an invoice that bills through a panel.
    pub async fn create_claim(
        &self,
        clinic_id: Uuid,
        request: CreateClaimRequest,
        auth_token: &str,
    ) -> Result<PanelClaim> {
        debug!("Creating claim for invoice {}", request.invoice_id);

        let invoice_path = format!(
            "/rest/v1/invoices?id=eq.{}&clinic_id=eq.{}",
            request.invoice_id, clinic_id
        );
        let invoices: Vec<Value> = self
            .supabase
            .request(Method::GET, &invoice_path, Some(auth_token), None)
            .await?;

        if invoices.is_empty() {
            return Err(anyhow!(BillingError::InvoiceNotFound));
        }

        let invoice: Invoice = serde_json::from_value(invoices[0].clone())?;

        let panel_id = invoice.panel_id.ok_or_else(|| {
            anyhow!(BillingError::Validation(
                "Invoice does not bill through a panel".to_string()
            ))
        })?;

        let amount_claimed = request.amount_claimed.unwrap_or(invoice.total);
        if amount_claimed <= 0.0 {
            return Err(anyhow!(BillingError::Validation(
                "Claim amount must be positive".to_string()
            )));
        }

        let claim_number = self
            .next_claim_number(clinic_id, auth_token)
            .await?;

        let claim_data = json!({
            "clinic_id": clinic_id,
            "panel_id": panel_id,
            "invoice_id": invoice.id,
            "claim_number": claim_number,
            "amount_claimed": amount_claimed,
            "amount_paid": 0.0,
            "status": ClaimStatus::Draft,
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/panel_claims",
                Some(auth_token),
                Some(claim_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create claim"));
        }

        let claim: PanelClaim = serde_json::from_value(result[0].clone())?;
        info!("Claim {} drafted for invoice {}", claim.claim_number, invoice.id);

        Ok(claim)
    }

    async fn next_claim_number(&self, clinic_id: Uuid, auth_token: &str) -> Result<String> {
        let year = Utc::now().format("%Y");
        let count_path = format!(
            "/rest/v1/panel_claims?clinic_id=eq.{}&select=id&claim_number=like.CLM-{}-*",
            clinic_id, year
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &count_path, Some(auth_token), None)
            .await?;

        Ok(format!("CLM-{}-{:04}", year, existing.len() + 1))
    }

    pub async fn get_claim(
        &self,
        clinic_id: Uuid,
        claim_id: &str,
        auth_token: &str,
    ) -> Result<PanelClaim> {
        let path = format!(
            "/rest/v1/panel_claims?id=eq.{}&clinic_id=eq.{}",
            claim_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!(BillingError::ClaimNotFound));
        }

        let claim: PanelClaim = serde_json::from_value(result[0].clone())?;
        Ok(claim)
    }

    pub async fn list_claims(
        &self,
        clinic_id: Uuid,
        query: ClaimListQuery,
        auth_token: &str,
    ) -> Result<Vec<PanelClaim>> {
        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(panel_id) = query.panel_id {
            query_parts.push(format!("panel_id=eq.{}", panel_id));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/panel_claims?{}&order=created_at.desc&limit={}&offset={}",
            query_parts.join("&"),
            limit,
            offset
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let claims: Vec<PanelClaim> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(claims)
    }

    pub async fn transition_claim(
        &self,
        clinic_id: Uuid,
        claim_id: &str,
        request: TransitionClaimRequest,
        auth_token: &str,
    ) -> Result<PanelClaim> {
        let claim = self.get_claim(clinic_id, claim_id, auth_token).await?;

        if !can_transition(claim.status, request.status) {
            warn!(
                "Claim {} transition {} -> {} not permitted",
                claim.claim_number, claim.status, request.status
            );
            return Err(anyhow!(BillingError::TransitionNotPermitted {
                from: claim.status,
                to: request.status,
            }));
        }

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(request.status));

        match request.status {
            ClaimStatus::Submitted => {
                update_data.insert("submitted_at".to_string(), json!(Utc::now().to_rfc3339()));
            }
            ClaimStatus::Paid => {
                let amount_paid = request.amount_paid.ok_or_else(|| {
                    anyhow!(BillingError::Validation(
                        "Marking a claim paid requires amount_paid".to_string()
                    ))
                })?;
                if amount_paid <= 0.0 {
                    return Err(anyhow!(BillingError::Validation(
                        "amount_paid must be positive".to_string()
                    )));
                }
                update_data.insert("amount_paid".to_string(), json!(amount_paid));
                update_data.insert("paid_at".to_string(), json!(Utc::now().to_rfc3339()));
            }
            ClaimStatus::ShortPaid => {
                let amount_paid = request.amount_paid.ok_or_else(|| {
                    anyhow!(BillingError::Validation(
                        "Marking a claim short-paid requires amount_paid".to_string()
                    ))
                })?;
                if amount_paid <= 0.0 || amount_paid >= claim.amount_claimed {
                    return Err(anyhow!(BillingError::Validation(
                        "Short payment must be positive and below the claimed amount"
                            .to_string()
                    )));
                }
                update_data.insert("amount_paid".to_string(), json!(amount_paid));
            }
            ClaimStatus::Rejected => {
                update_data.insert(
                    "rejection_reason".to_string(),
                    json!(request.rejection_reason),
                );
            }
            _ => {}
        }

        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/panel_claims?id=eq.{}&clinic_id=eq.{}",
            claim_id, clinic_id
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
            return Err(anyhow!("Failed to transition claim"));
        }

        let updated: PanelClaim = serde_json::from_value(result[0].clone())?;
        info!(
            "Claim {} moved {} -> {}",
            updated.claim_number, claim.status, updated.status
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClaimStatus::*;

    // The full legality relation, row by row. Everything not listed here
    // must be rejected.
    const TABLE: [(ClaimStatus, &[ClaimStatus]); 6] = [
        (Draft, &[Submitted, Rejected]),
        (Submitted, &[Approved, ShortPaid, Rejected, Paid]),
        (Approved, &[Paid, ShortPaid]),
        (ShortPaid, &[Paid, Submitted]),
        (Rejected, &[Draft, Submitted]),
        (Paid, &[]),
    ];

    #[test]
    fn legality_matches_the_table_for_every_pair() {
        for (from, allowed) in TABLE {
            for to in ClaimStatus::ALL {
                assert_eq!(
                    can_transition(from, to),
                    allowed.contains(&to),
                    "({:?} -> {:?}) disagrees with the table",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn paid_is_terminal() {
        for to in ClaimStatus::ALL {
            assert!(!can_transition(Paid, to));
        }
    }

    #[test]
    fn rejected_claims_can_be_reworked() {
        assert!(can_transition(Rejected, Draft));
        assert!(can_transition(Rejected, Submitted));
    }

    #[test]
    fn self_transitions_are_never_legal() {
        for status in ClaimStatus::ALL {
            assert!(!can_transition(status, status));
        }
    }
}
