use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    ConsultationError, ConsultationSession, SessionListQuery, SessionStatus, StartSessionRequest,
    UpdateNotesRequest,
};

pub struct ConsultationService {
    supabase: SupabaseClient,
}

impl ConsultationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn start_session(
        &self,
        clinic_id: Uuid,
        request: StartSessionRequest,
        auth_token: &str,
    ) -> Result<ConsultationSession> {
        info!(
            "Starting consultation for patient {} with {}",
            request.patient_id, request.practitioner_name
        );

        let session_data = json!({
            "clinic_id": clinic_id,
            "patient_id": request.patient_id,
            "appointment_id": request.appointment_id,
            "queue_entry_id": request.queue_entry_id,
            "practitioner_name": request.practitioner_name,
            "status": SessionStatus::InProgress,
            "started_at": Utc::now().to_rfc3339(),
            "presenting_complaint": request.presenting_complaint
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/consultation_sessions",
                Some(auth_token),
                Some(session_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to start consultation session"));
        }

        let session: ConsultationSession = serde_json::from_value(result[0].clone())?;

        // Hand-off from the waiting room: the queue entry moves with us.
        if let Some(queue_entry_id) = request.queue_entry_id {
            let queue_update = json!({ "status": "in_consultation" });
            let queue_path = format!(
                "/rest/v1/queue_entries?id=eq.{}&clinic_id=eq.{}",
                queue_entry_id, clinic_id
            );
            let _: Vec<Value> = self
                .supabase
                .request(Method::PATCH, &queue_path, Some(auth_token), Some(queue_update))
                .await?;
            debug!("Queue entry {} moved to in_consultation", queue_entry_id);
        }

        info!("Consultation session {} started", session.id);
        Ok(session)
    }

    pub async fn get_session(
        &self,
        clinic_id: Uuid,
        session_id: &str,
        auth_token: &str,
    ) -> Result<ConsultationSession> {
        let path = format!(
            "/rest/v1/consultation_sessions?id=eq.{}&clinic_id=eq.{}",
            session_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!(ConsultationError::NotFound));
        }

        let session: ConsultationSession = serde_json::from_value(result[0].clone())?;
        Ok(session)
    }

    pub async fn list_sessions(
        &self,
        clinic_id: Uuid,
        query: SessionListQuery,
        auth_token: &str,
    ) -> Result<Vec<ConsultationSession>> {
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
            "/rest/v1/consultation_sessions?{}&order=started_at.desc&limit={}&offset={}",
            query_parts.join("&"),
            limit,
            offset
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let sessions: Vec<ConsultationSession> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    pub async fn update_notes(
        &self,
        clinic_id: Uuid,
        session_id: &str,
        request: UpdateNotesRequest,
        auth_token: &str,
    ) -> Result<ConsultationSession> {
        let session = self.get_session(clinic_id, session_id, auth_token).await?;

        if session.status == SessionStatus::Completed {
            return Err(anyhow!(ConsultationError::AlreadyCompleted));
        }

        let mut update_data = serde_json::Map::new();
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(presenting_complaint) = request.presenting_complaint {
            update_data.insert(
                "presenting_complaint".to_string(),
                json!(presenting_complaint),
            );
        }
        if let Some(diagnosis) = request.diagnosis {
            update_data.insert("diagnosis".to_string(), json!(diagnosis));
        }

        let path = format!(
            "/rest/v1/consultation_sessions?id=eq.{}&clinic_id=eq.{}",
            session_id, clinic_id
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
            return Err(anyhow!("Failed to update consultation notes"));
        }

        let updated: ConsultationSession = serde_json::from_value(result[0].clone())?;
        Ok(updated)
    }

    pub async fn complete_session(
        &self,
        clinic_id: Uuid,
        session_id: &str,
        auth_token: &str,
    ) -> Result<ConsultationSession> {
        let session = self.get_session(clinic_id, session_id, auth_token).await?;

        if session.status == SessionStatus::Completed {
            return Err(anyhow!(ConsultationError::AlreadyCompleted));
        }

        let update_data = json!({
            "status": SessionStatus::Completed,
            "ended_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/consultation_sessions?id=eq.{}&clinic_id=eq.{}",
            session_id, clinic_id
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
            return Err(anyhow!("Failed to complete consultation session"));
        }

        // Completed consultation also completes the queue entry.
        if let Some(queue_entry_id) = session.queue_entry_id {
            let queue_update = json!({
                "status": "completed",
                "completed_at": Utc::now().to_rfc3339()
            });
            let queue_path = format!(
                "/rest/v1/queue_entries?id=eq.{}&clinic_id=eq.{}",
                queue_entry_id, clinic_id
            );
            let _: Vec<Value> = self
                .supabase
                .request(Method::PATCH, &queue_path, Some(auth_token), Some(queue_update))
                .await?;
        }

        let completed: ConsultationSession = serde_json::from_value(result[0].clone())?;
        info!("Consultation session {} completed", completed.id);
        Ok(completed)
    }
}
