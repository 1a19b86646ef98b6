use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub stripe_webhook_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            stripe_secret_key: "sk_test_key".to_string(),
            stripe_webhook_secret: self.stripe_webhook_secret.clone(),
            base_domain: "clinicore.test".to_string(),
            subscription_grace_days: 7,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub clinic_id: Uuid,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "staff".to_string(),
            clinic_id: Uuid::new_v4(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            clinic_id: Uuid::new_v4(),
        }
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn in_clinic(mut self, clinic_id: Uuid) -> Self {
        self.clinic_id = clinic_id;
        self
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            app_metadata: Some(json!({ "clinic_id": self.clinic_id })),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "app_metadata": { "clinic_id": user.clinic_id },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct StripeTestUtils;

impl StripeTestUtils {
    /// Build a `Stripe-Signature` header value over `payload` the way
    /// Stripe signs deliveries: HMAC-SHA256 of `{timestamp}.{payload}`.
    pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signed_payload.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!("t={},v1={}", timestamp, hex_encode(&signature))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(patient_id: &str, clinic_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "clinic_id": clinic_id,
            "first_name": name,
            "last_name": "Tester",
            "email": "patient@example.com",
            "phone": "0123456789",
            "address": null,
            "postal_code": null,
            "national_id": "900101-10-1234",
            "date_of_birth": "1990-01-01",
            "gender": "female",
            "allergies": null,
            "medical_notes": null,
            "panel_id": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn clinic_response(clinic_id: &str, subdomain: &str) -> serde_json::Value {
        json!({
            "id": clinic_id,
            "name": "Test Clinic",
            "subdomain": subdomain,
            "address": "1 Test Street",
            "phone": "0123456789",
            "email": "clinic@example.com",
            "timezone": "Asia/Kuala_Lumpur",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        clinic_id: &str,
        patient_id: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "practitioner_name": "Dr. Test",
            "scheduled_start": "2030-06-02T10:00:00Z",
            "duration_minutes": 15,
            "status": status,
            "reason": "checkup",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn queue_entry_response(
        entry_id: &str,
        clinic_id: &str,
        patient_id: &str,
        ticket_number: i32,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": entry_id,
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "appointment_id": null,
            "ticket_number": ticket_number,
            "status": status,
            "queued_at": "2024-01-01T08:00:00Z",
            "called_at": null,
            "completed_at": null,
            "notes": null
        })
    }

    pub fn medication_response(
        medication_id: &str,
        clinic_id: &str,
        stock: f64,
        average_cost: f64,
    ) -> serde_json::Value {
        json!({
            "id": medication_id,
            "clinic_id": clinic_id,
            "name": "Paracetamol 500mg",
            "unit": "tablet",
            "stock_on_hand": stock,
            "average_cost": average_cost,
            "selling_price": 0.5,
            "reorder_level": 100.0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn claim_response(
        claim_id: &str,
        clinic_id: &str,
        invoice_id: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": claim_id,
            "clinic_id": clinic_id,
            "panel_id": Uuid::new_v4(),
            "invoice_id": invoice_id,
            "claim_number": "CLM-2024-0001",
            "amount_claimed": 120.0,
            "amount_paid": 0.0,
            "status": status,
            "submitted_at": null,
            "paid_at": null,
            "rejection_reason": null,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn subscription_response(
        clinic_id: &str,
        status: &str,
        current_period_end: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "stripe_customer_id": "cus_test123",
            "stripe_subscription_id": "sub_test123",
            "status": status,
            "plan": "standard",
            "current_period_end": current_period_end,
            "cancel_at_period_end": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_carries_clinic_claim() {
        let user = TestUser::staff("staff@example.com");
        let user_model = user.to_user();

        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.clinic_id(), Some(user.clinic_id));
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_stripe_signature_shape() {
        let sig = StripeTestUtils::sign_payload("{}", "whsec_test", 1700000000);
        assert!(sig.starts_with("t=1700000000,v1="));
    }
}
