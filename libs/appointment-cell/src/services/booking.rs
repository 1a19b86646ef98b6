use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, AppointmentStatus,
    BookAppointmentRequest, RescheduleRequest, UpdateStatusRequest,
};
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycle;

pub struct AppointmentService {
    supabase: SupabaseClient,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn book_appointment(
        &self,
        clinic_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment> {
        info!(
            "Booking appointment for patient {} with {} at {}",
            request.patient_id, request.practitioner_name, request.scheduled_start
        );

        if request.duration_minutes <= 0 {
            return Err(anyhow!(AppointmentError::InvalidTime(
                "Duration must be positive".to_string()
            )));
        }

        if request.scheduled_start <= Utc::now() {
            return Err(anyhow!(AppointmentError::InvalidTime(
                "Appointment must be scheduled for a future time".to_string()
            )));
        }

        if let Some(existing) = ConflictDetectionService::find_overlap(
            &self.supabase,
            clinic_id,
            &request.practitioner_name,
            request.scheduled_start,
            request.duration_minutes,
            None,
            auth_token,
        )
        .await?
        {
            debug!("Conflicting appointment: {}", existing.id);
            return Err(anyhow!(AppointmentError::Conflict {
                practitioner: request.practitioner_name.clone(),
            }));
        }

        let appointment_data = json!({
            "clinic_id": clinic_id,
            "patient_id": request.patient_id,
            "practitioner_name": request.practitioner_name,
            "scheduled_start": request.scheduled_start.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "status": AppointmentStatus::Scheduled,
            "reason": request.reason,
            "notes": request.notes,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to book appointment"));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())?;
        info!("Appointment {} booked", appointment.id);

        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        clinic_id: Uuid,
        appointment_id: &str,
        auth_token: &str,
    ) -> Result<Appointment> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}",
            appointment_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!(AppointmentError::NotFound));
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())?;
        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        clinic_id: Uuid,
        query: AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>> {
        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(date) = query.date {
            let day_start = date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time")
                .and_utc();
            let day_end = day_start + Duration::days(1);
            query_parts.push(format!("scheduled_start=gte.{}", day_start.to_rfc3339()));
            query_parts.push(format!("scheduled_start=lt.{}", day_end.to_rfc3339()));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=scheduled_start.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(appointments)
    }

    pub async fn update_status(
        &self,
        clinic_id: Uuid,
        appointment_id: &str,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment> {
        let appointment = self
            .get_appointment(clinic_id, appointment_id, auth_token)
            .await?;

        AppointmentLifecycle::validate_transition(appointment.status, request.status)
            .map_err(|e| anyhow!(e))?;

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(request.status));
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}",
            appointment_id, clinic_id
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
            return Err(anyhow!("Failed to update appointment status"));
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())?;
        info!(
            "Appointment {} moved {} -> {}",
            updated.id, appointment.status, updated.status
        );
        Ok(updated)
    }

    /// Rescheduling re-runs the conflict check against the new window and
    /// resets the status to scheduled.
    pub async fn reschedule(
        &self,
        clinic_id: Uuid,
        appointment_id: &str,
        request: RescheduleRequest,
        auth_token: &str,
    ) -> Result<Appointment> {
        let appointment = self
            .get_appointment(clinic_id, appointment_id, auth_token)
            .await?;

        if matches!(
            appointment.status,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        ) {
            return Err(anyhow!(
                "Cannot reschedule a {} appointment",
                appointment.status
            ));
        }

        if request.scheduled_start <= Utc::now() {
            return Err(anyhow!(AppointmentError::InvalidTime(
                "Appointment must be rescheduled to a future time".to_string()
            )));
        }

        let duration = request.duration_minutes.unwrap_or(appointment.duration_minutes);

        if let Some(existing) = ConflictDetectionService::find_overlap(
            &self.supabase,
            clinic_id,
            &appointment.practitioner_name,
            request.scheduled_start,
            duration,
            Some(appointment.id),
            auth_token,
        )
        .await?
        {
            debug!("Conflicting appointment: {}", existing.id);
            return Err(anyhow!(AppointmentError::Conflict {
                practitioner: appointment.practitioner_name.clone(),
            }));
        }

        let update_data = json!({
            "scheduled_start": request.scheduled_start.to_rfc3339(),
            "duration_minutes": duration,
            "status": AppointmentStatus::Scheduled,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&clinic_id=eq.{}",
            appointment_id, clinic_id
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
            return Err(anyhow!("Failed to reschedule appointment"));
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())?;
        info!("Appointment {} rescheduled to {}", updated.id, updated.scheduled_start);
        Ok(updated)
    }
}
