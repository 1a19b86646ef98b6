use std::env;

use anyhow::{anyhow, Result};
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{ConsultationError, NotesCleanupResponse};
use crate::services::session::ConsultationService;

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct NotesCleanupService {
    openai_api_key: String,
    openai_base_url: String,
    supabase: SupabaseClient,
    http_client: Client,
}

impl NotesCleanupService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            openai_api_key,
            openai_base_url: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            supabase: SupabaseClient::new(config),
            http_client: Client::new(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(config: &AppConfig, api_key: &str, base_url: &str) -> Self {
        Self {
            openai_api_key: api_key.to_string(),
            openai_base_url: base_url.to_string(),
            supabase: SupabaseClient::new(config),
            http_client: Client::new(),
        }
    }

    /// Tidy up the raw notes of a session and store the result alongside
    /// them. The raw text stays untouched.
    pub async fn cleanup_notes(
        &self,
        config: &AppConfig,
        clinic_id: Uuid,
        session_id: &str,
        auth_token: &str,
    ) -> Result<NotesCleanupResponse> {
        let session_service = ConsultationService::new(config);
        let session = session_service
            .get_session(clinic_id, session_id, auth_token)
            .await?;

        let raw_notes = session
            .notes
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| anyhow!(ConsultationError::NoNotes))?;

        debug!("Cleaning up notes for session {}", session.id);

        let prompt = json!({
            "model": "gpt-4o-mini",
            "messages": [
                {
                    "role": "system",
                    "content": "You tidy up clinical consultation notes. Fix grammar, \
                                spelling and structure only. Never add, remove or alter \
                                any medical fact, measurement or medication name."
                },
                {
                    "role": "user",
                    "content": raw_notes
                }
            ],
            "temperature": 0.2
        });

        let response = self
            .http_client
            .post(&self.openai_base_url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.openai_api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .json(&prompt)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("OpenAI API error: {}", error_text));
        }

        let ai_response: Value = response.json().await?;
        let cleaned = ai_response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid OpenAI response format"))?
            .to_string();

        let update_data = json!({ "cleaned_notes": cleaned });
        let path = format!(
            "/rest/v1/consultation_sessions?id=eq.{}&clinic_id=eq.{}",
            session_id, clinic_id
        );
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                reqwest::Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(return_representation()),
            )
            .await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to store cleaned notes"));
        }

        Ok(NotesCleanupResponse {
            session_id: session.id,
            original_notes: raw_notes,
            cleaned_notes: cleaned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use shared_utils::test_utils::TestConfig;

    fn session_row(session_id: &Uuid, clinic_id: &Uuid, notes: Option<&str>) -> Value {
        json!({
            "id": session_id,
            "clinic_id": clinic_id,
            "patient_id": Uuid::new_v4(),
            "appointment_id": null,
            "queue_entry_id": null,
            "practitioner_name": "Dr. Test",
            "status": "in_progress",
            "started_at": "2024-01-01T09:00:00Z",
            "ended_at": null,
            "presenting_complaint": null,
            "notes": notes,
            "cleaned_notes": null,
            "diagnosis": null
        })
    }

    #[tokio::test]
    async fn cleanup_stores_the_tidied_text_and_keeps_the_original() {
        let mock_server = MockServer::start().await;
        let session_id = Uuid::new_v4();
        let clinic_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/consultation_sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                session_row(&session_id, &clinic_id, Some("pt c/o cough 3d, no fever"))
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "content": "Patient complains of cough for 3 days, no fever."
                    }
                }]
            })))
            .mount(&mock_server)
            .await;

        let mut patched = session_row(&session_id, &clinic_id, Some("pt c/o cough 3d, no fever"));
        patched["cleaned_notes"] = json!("Patient complains of cough for 3 days, no fever.");
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/consultation_sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([patched])))
            .mount(&mock_server)
            .await;

        let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
        let service = NotesCleanupService::with_base_url(
            &config,
            "sk-test",
            &format!("{}/v1/chat/completions", mock_server.uri()),
        );

        let result = service
            .cleanup_notes(&config, clinic_id, &session_id.to_string(), "test-token")
            .await
            .expect("cleanup should succeed");

        assert_eq!(result.original_notes, "pt c/o cough 3d, no fever");
        assert!(result.cleaned_notes.starts_with("Patient complains"));
    }

    #[tokio::test]
    async fn cleanup_without_notes_is_rejected() {
        let mock_server = MockServer::start().await;
        let session_id = Uuid::new_v4();
        let clinic_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/rest/v1/consultation_sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                session_row(&session_id, &clinic_id, None)
            ])))
            .mount(&mock_server)
            .await;

        let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
        let service = NotesCleanupService::with_base_url(
            &config,
            "sk-test",
            &format!("{}/v1/chat/completions", mock_server.uri()),
        );

        let result = service
            .cleanup_notes(&config, clinic_id, &session_id.to_string(), "test-token")
            .await;

        let err = result.expect_err("no notes to clean");
        assert!(err.to_string().contains("no notes"));
    }
}
