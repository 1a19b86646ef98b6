use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreatePanelRequest, Panel, UpdatePanelRequest};

pub struct PanelService {
    supabase: SupabaseClient,
}

impl PanelService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_panel(
        &self,
        clinic_id: Uuid,
        request: CreatePanelRequest,
        auth_token: &str,
    ) -> Result<Panel> {
        debug!("Creating panel '{}' for clinic {}", request.name, clinic_id);

        let panel_data = json!({
            "clinic_id": clinic_id,
            "name": request.name,
            "contact_person": request.contact_person,
            "phone": request.phone,
            "email": request.email,
            "address": request.address,
            "active": true,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/panels",
                Some(auth_token),
                Some(panel_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create panel"));
        }

        let panel: Panel = serde_json::from_value(result[0].clone())?;
        info!("Panel {} created", panel.id);

        Ok(panel)
    }

    pub async fn get_panel(
        &self,
        clinic_id: Uuid,
        panel_id: &str,
        auth_token: &str,
    ) -> Result<Panel> {
        let path = format!(
            "/rest/v1/panels?id=eq.{}&clinic_id=eq.{}",
            panel_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Panel not found"));
        }

        let panel: Panel = serde_json::from_value(result[0].clone())?;
        Ok(panel)
    }

    pub async fn list_panels(&self, clinic_id: Uuid, auth_token: &str) -> Result<Vec<Panel>> {
        let path = format!(
            "/rest/v1/panels?clinic_id=eq.{}&order=name.asc",
            clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let panels: Vec<Panel> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(panels)
    }

    pub async fn update_panel(
        &self,
        clinic_id: Uuid,
        panel_id: &str,
        request: UpdatePanelRequest,
        auth_token: &str,
    ) -> Result<Panel> {
        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(contact_person) = request.contact_person {
            update_data.insert("contact_person".to_string(), json!(contact_person));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(active) = request.active {
            update_data.insert("active".to_string(), json!(active));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/panels?id=eq.{}&clinic_id=eq.{}",
            panel_id, clinic_id
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
            return Err(anyhow!("Failed to update panel"));
        }

        let panel: Panel = serde_json::from_value(result[0].clone())?;
        Ok(panel)
    }
}
