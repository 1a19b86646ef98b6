use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    CheckInRequest, QueueEntry, QueueError, QueueStatus, UpdateQueueStatusRequest,
};

pub struct QueueService {
    supabase: SupabaseClient,
}

impl QueueService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn valid_transitions(current: QueueStatus) -> &'static [QueueStatus] {
        use QueueStatus::*;
        match current {
            Waiting => &[Called, Skipped],
            // A called patient who does not show up goes back to waiting
            // or gets skipped.
            Called => &[InConsultation, Skipped, Waiting],
            InConsultation => &[Completed],
            Completed => &[],
            Skipped => &[],
        }
    }

    pub fn can_transition(from: QueueStatus, to: QueueStatus) -> bool {
        Self::valid_transitions(from).contains(&to)
    }

    fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc();
        (start, start + Duration::days(1))
    }

    pub async fn check_in(
        &self,
        clinic_id: Uuid,
        request: CheckInRequest,
        auth_token: &str,
    ) -> Result<QueueEntry> {
        info!("Checking in patient {} at clinic {}", request.patient_id, clinic_id);

        // Today's highest ticket so far; numbering restarts each day.
        let (day_start, day_end) = Self::day_bounds(Utc::now().date_naive());
        let max_path = format!(
            "/rest/v1/queue_entries?clinic_id=eq.{}&queued_at=gte.{}&queued_at=lt.{}\
             &select=ticket_number&order=ticket_number.desc&limit=1",
            clinic_id,
            day_start.to_rfc3339(),
            day_end.to_rfc3339()
        );
        let latest: Vec<Value> = self
            .supabase
            .request(Method::GET, &max_path, Some(auth_token), None)
            .await?;

        let next_ticket = latest
            .first()
            .and_then(|v| v["ticket_number"].as_i64())
            .unwrap_or(0) as i32
            + 1;

        let entry_data = json!({
            "clinic_id": clinic_id,
            "patient_id": request.patient_id,
            "appointment_id": request.appointment_id,
            "ticket_number": next_ticket,
            "status": QueueStatus::Waiting,
            "queued_at": Utc::now().to_rfc3339(),
            "notes": request.notes
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/queue_entries",
                Some(auth_token),
                Some(entry_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to check in patient"));
        }

        let entry: QueueEntry = serde_json::from_value(result[0].clone())?;
        info!("Patient checked in with ticket {}", entry.ticket_number);

        Ok(entry)
    }

    /// Move the lowest waiting ticket to called. Never skips a lower
    /// waiting ticket.
    pub async fn call_next(&self, clinic_id: Uuid, auth_token: &str) -> Result<QueueEntry> {
        let (day_start, day_end) = Self::day_bounds(Utc::now().date_naive());
        let path = format!(
            "/rest/v1/queue_entries?clinic_id=eq.{}&status=eq.waiting\
             &queued_at=gte.{}&queued_at=lt.{}&order=ticket_number.asc&limit=1",
            clinic_id,
            day_start.to_rfc3339(),
            day_end.to_rfc3339()
        );
        let waiting: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if waiting.is_empty() {
            return Err(anyhow!(QueueError::Empty));
        }

        let next: QueueEntry = serde_json::from_value(waiting[0].clone())?;
        debug!("Calling ticket {}", next.ticket_number);

        let update_data = json!({
            "status": QueueStatus::Called,
            "called_at": Utc::now().to_rfc3339()
        });

        let update_path = format!("/rest/v1/queue_entries?id=eq.{}", next.id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &update_path,
                Some(auth_token),
                Some(update_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to call next patient"));
        }

        let called: QueueEntry = serde_json::from_value(result[0].clone())?;
        info!("Ticket {} called", called.ticket_number);
        Ok(called)
    }

    pub async fn update_status(
        &self,
        clinic_id: Uuid,
        entry_id: &str,
        request: UpdateQueueStatusRequest,
        auth_token: &str,
    ) -> Result<QueueEntry> {
        let path = format!(
            "/rest/v1/queue_entries?id=eq.{}&clinic_id=eq.{}",
            entry_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!(QueueError::NotFound));
        }

        let entry: QueueEntry = serde_json::from_value(result[0].clone())?;

        if !Self::can_transition(entry.status, request.status) {
            return Err(anyhow!(QueueError::InvalidTransition {
                from: entry.status,
                to: request.status,
            }));
        }

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(request.status));
        if request.status == QueueStatus::Completed {
            update_data.insert("completed_at".to_string(), json!(Utc::now().to_rfc3339()));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        let updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(return_representation()),
            )
            .await?;

        if updated.is_empty() {
            return Err(anyhow!("Failed to update queue entry"));
        }

        let updated_entry: QueueEntry = serde_json::from_value(updated[0].clone())?;
        info!(
            "Queue entry {} moved {} -> {}",
            updated_entry.id, entry.status, updated_entry.status
        );
        Ok(updated_entry)
    }

    pub async fn list_today(&self, clinic_id: Uuid, auth_token: &str) -> Result<Vec<QueueEntry>> {
        let (day_start, day_end) = Self::day_bounds(Utc::now().date_naive());
        let path = format!(
            "/rest/v1/queue_entries?clinic_id=eq.{}&queued_at=gte.{}&queued_at=lt.{}\
             &order=ticket_number.asc",
            clinic_id,
            day_start.to_rfc3339(),
            day_end.to_rfc3339()
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let entries: Vec<QueueEntry> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use QueueStatus::*;

    #[test]
    fn terminal_statuses_have_no_exits() {
        assert!(QueueService::valid_transitions(Completed).is_empty());
        assert!(QueueService::valid_transitions(Skipped).is_empty());
    }

    #[test]
    fn called_patient_can_return_to_waiting() {
        assert!(QueueService::can_transition(Called, Waiting));
        assert!(QueueService::can_transition(Called, Skipped));
        assert!(QueueService::can_transition(Called, InConsultation));
    }

    #[test]
    fn waiting_cannot_jump_to_consultation() {
        assert!(!QueueService::can_transition(Waiting, InConsultation));
        assert!(!QueueService::can_transition(Waiting, Completed));
    }
}
