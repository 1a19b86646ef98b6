use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{Clinic, CreateClinicRequest, UpdateClinicRequest};
use crate::services::subdomain::SubdomainService;

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_clinic(
        &self,
        request: CreateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic> {
        let subdomain = request.subdomain.trim().to_lowercase();
        debug!("Creating clinic '{}' at subdomain {}", request.name, subdomain);

        SubdomainService::validate_format(&subdomain).map_err(|reason| anyhow!(reason))?;

        let existing_path = format!(
            "/rest/v1/clinics?subdomain=eq.{}&select=id",
            urlencoding::encode(&subdomain)
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await?;

        if !existing.is_empty() {
            return Err(anyhow!("Subdomain {} is already taken", subdomain));
        }

        let clinic_data = json!({
            "name": request.name,
            "subdomain": subdomain,
            "address": request.address,
            "phone": request.phone,
            "email": request.email,
            "timezone": request.timezone.unwrap_or_else(|| "UTC".to_string()),
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clinics",
                Some(auth_token),
                Some(clinic_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create clinic"));
        }

        let clinic: Clinic = serde_json::from_value(result[0].clone())?;
        debug!("Clinic created successfully with ID: {}", clinic.id);

        Ok(clinic)
    }

    pub async fn get_clinic(&self, clinic_id: &str, auth_token: &str) -> Result<Clinic> {
        debug!("Fetching clinic: {}", clinic_id);

        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Clinic not found"));
        }

        let clinic: Clinic = serde_json::from_value(result[0].clone())?;
        Ok(clinic)
    }

    pub async fn update_clinic(
        &self,
        clinic_id: &str,
        request: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic> {
        debug!("Updating clinic: {}", clinic_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(timezone) = request.timezone {
            update_data.insert("timezone".to_string(), json!(timezone));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
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
            return Err(anyhow!("Failed to update clinic"));
        }

        let clinic: Clinic = serde_json::from_value(result[0].clone())?;
        Ok(clinic)
    }
}
