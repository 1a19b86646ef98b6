use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreatePatientRequest, Patient, PatientSearchQuery, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        clinic_id: Uuid,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!(
            "Creating patient record for {} {} in clinic {}",
            request.first_name, request.last_name, clinic_id
        );

        // A national id registered twice within one clinic is a data-entry
        // mistake, not a new patient.
        if let Some(national_id) = &request.national_id {
            let existing_path = format!(
                "/rest/v1/patients?clinic_id=eq.{}&national_id=eq.{}&select=id",
                clinic_id,
                urlencoding::encode(national_id)
            );
            let existing: Vec<Value> = self
                .supabase
                .request(Method::GET, &existing_path, Some(auth_token), None)
                .await?;

            if !existing.is_empty() {
                return Err(anyhow!(
                    "Patient with national id {} already registered",
                    national_id
                ));
            }
        }

        let patient_data = json!({
            "clinic_id": clinic_id,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone": request.phone,
            "address": request.address,
            "postal_code": request.postal_code,
            "national_id": request.national_id,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "gender": request.gender,
            "allergies": request.allergies,
            "medical_notes": request.medical_notes,
            "panel_id": request.panel_id,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(patient_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create patient record"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        debug!("Patient record created with ID: {}", patient.id);

        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        clinic_id: Uuid,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Fetching patient record: {}", patient_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&clinic_id=eq.{}",
            patient_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Patient not found"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(patient)
    }

    pub async fn update_patient(
        &self,
        clinic_id: Uuid,
        patient_id: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Updating patient record: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(postal_code) = request.postal_code {
            update_data.insert("postal_code".to_string(), json!(postal_code));
        }
        if let Some(allergies) = request.allergies {
            update_data.insert("allergies".to_string(), json!(allergies));
        }
        if let Some(medical_notes) = request.medical_notes {
            update_data.insert("medical_notes".to_string(), json!(medical_notes));
        }
        if let Some(panel_id) = request.panel_id {
            update_data.insert("panel_id".to_string(), json!(panel_id));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/patients?id=eq.{}&clinic_id=eq.{}",
            patient_id, clinic_id
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
            return Err(anyhow!("Failed to update patient record"));
        }

        let updated_patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(updated_patient)
    }

    pub async fn search_patients(
        &self,
        clinic_id: Uuid,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = vec![format!("clinic_id=eq.{}", clinic_id)];

        if let Some(name) = query.name {
            let term = urlencoding::encode(&name).into_owned();
            query_parts.push(format!(
                "or=(first_name.ilike.%{}%,last_name.ilike.%{}%)",
                term, term
            ));
        }
        if let Some(phone) = query.phone {
            query_parts.push(format!("phone=ilike.%{}%", urlencoding::encode(&phone)));
        }
        if let Some(national_id) = query.national_id {
            query_parts.push(format!(
                "national_id=eq.{}",
                urlencoding::encode(&national_id)
            ));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/patients?{}&order=last_name.asc&limit={}&offset={}",
            query_parts.join("&"),
            limit,
            offset
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let patients: Vec<Patient> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }
}
