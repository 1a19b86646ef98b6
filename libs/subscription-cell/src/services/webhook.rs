use anyhow::{anyhow, Result};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{SubscriptionError, SubscriptionStatus};

type HmacSha256 = Hmac<Sha256>;

/// Replay window for webhook deliveries, matching Stripe's default.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct WebhookService {
    supabase: SupabaseClient,
    webhook_secret: String,
}

impl WebhookService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            webhook_secret: config.stripe_webhook_secret.clone(),
        }
    }

    /// Verify a `Stripe-Signature` header against the raw body. The body
    /// is never parsed before this passes.
    pub fn verify_signature(&self, payload: &str, signature_header: &str) -> Result<()> {
        Self::verify_signature_at(
            payload,
            signature_header,
            &self.webhook_secret,
            Utc::now().timestamp(),
        )
    }

    pub fn verify_signature_at(
        payload: &str,
        signature_header: &str,
        secret: &str,
        now_ts: i64,
    ) -> Result<()> {
        if secret.is_empty() {
            return Err(anyhow!(SubscriptionError::InvalidSignature(
                "Webhook secret is not configured".to_string()
            )));
        }

        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<Vec<u8>> = Vec::new();

        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => {
                    if let Ok(bytes) = hex_decode(value) {
                        candidates.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            anyhow!(SubscriptionError::InvalidSignature(
                "Missing timestamp in signature header".to_string()
            ))
        })?;

        if (now_ts - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(anyhow!(SubscriptionError::InvalidSignature(
                "Timestamp outside the tolerance window".to_string()
            )));
        }

        if candidates.is_empty() {
            return Err(anyhow!(SubscriptionError::InvalidSignature(
                "No v1 signature in header".to_string()
            )));
        }

        let signed_payload = format!("{}.{}", timestamp, payload);

        for candidate in &candidates {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|_| anyhow!("Failed to create HMAC"))?;
            mac.update(signed_payload.as_bytes());
            if mac.verify_slice(candidate).is_ok() {
                return Ok(());
            }
        }

        Err(anyhow!(SubscriptionError::InvalidSignature(
            "Signature mismatch".to_string()
        )))
    }

    /// Dispatch one verified event. Writes run under the service-role key
    /// since there is no end-user JWT in webhook context. Unknown event
    /// types are acknowledged and dropped.
    pub async fn handle_event(&self, event: &Value) -> Result<()> {
        let event_type = event["type"].as_str().unwrap_or_default();
        let object = &event["data"]["object"];

        debug!("Handling Stripe event: {}", event_type);

        match event_type {
            "checkout.session.completed" => self.handle_checkout_completed(object).await,
            "customer.subscription.updated" => self.handle_subscription_updated(object).await,
            "customer.subscription.deleted" => self.handle_subscription_deleted(object).await,
            "invoice.payment_failed" => self.handle_payment_failed(object).await,
            other => {
                debug!("Ignoring unhandled event type: {}", other);
                Ok(())
            }
        }
    }

    async fn handle_checkout_completed(&self, session: &Value) -> Result<()> {
        let clinic_id = session["metadata"]["clinic_id"].as_str().ok_or_else(|| {
            anyhow!("checkout.session.completed carries no clinic_id metadata")
        })?;
        let customer_id = session["customer"].as_str().unwrap_or_default();
        let subscription_id = session["subscription"].as_str().unwrap_or_default();

        info!("Checkout completed for clinic {}", clinic_id);

        let subscription_data = json!({
            "clinic_id": clinic_id,
            "stripe_customer_id": customer_id,
            "stripe_subscription_id": subscription_id,
            "status": SubscriptionStatus::Active,
            "plan": session["metadata"]["plan"].as_str().unwrap_or("standard"),
            "cancel_at_period_end": false,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let _: Vec<Value> = self
            .supabase
            .service_request(
                Method::POST,
                "/rest/v1/subscriptions?on_conflict=clinic_id",
                Some(subscription_data),
                Some(headers),
            )
            .await?;

        Ok(())
    }

    async fn handle_subscription_updated(&self, subscription: &Value) -> Result<()> {
        let subscription_id = subscription["id"]
            .as_str()
            .ok_or_else(|| anyhow!("subscription event carries no id"))?;

        let status = SubscriptionStatus::from_stripe(
            subscription["status"].as_str().unwrap_or_default(),
        );
        let cancel_at_period_end = subscription["cancel_at_period_end"]
            .as_bool()
            .unwrap_or(false);
        let current_period_end = subscription["current_period_end"]
            .as_i64()
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        info!(
            "Subscription {} updated: status {}",
            subscription_id, status
        );

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(status));
        update_data.insert(
            "cancel_at_period_end".to_string(),
            json!(cancel_at_period_end),
        );
        if let Some(period_end) = current_period_end {
            update_data.insert(
                "current_period_end".to_string(),
                json!(period_end.to_rfc3339()),
            );
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/subscriptions?stripe_subscription_id=eq.{}",
            subscription_id
        );
        let _: Vec<Value> = self
            .supabase
            .service_request(Method::PATCH, &path, Some(Value::Object(update_data)), None)
            .await?;

        Ok(())
    }

    async fn handle_subscription_deleted(&self, subscription: &Value) -> Result<()> {
        let subscription_id = subscription["id"]
            .as_str()
            .ok_or_else(|| anyhow!("subscription event carries no id"))?;

        info!("Subscription {} deleted", subscription_id);

        let update_data = json!({
            "status": SubscriptionStatus::Canceled,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/subscriptions?stripe_subscription_id=eq.{}",
            subscription_id
        );
        let _: Vec<Value> = self
            .supabase
            .service_request(Method::PATCH, &path, Some(update_data), None)
            .await?;

        Ok(())
    }

    async fn handle_payment_failed(&self, invoice: &Value) -> Result<()> {
        let subscription_id = invoice["subscription"].as_str().unwrap_or_default();
        if subscription_id.is_empty() {
            warn!("invoice.payment_failed without a subscription reference");
            return Ok(());
        }

        info!("Payment failed for subscription {}", subscription_id);

        let update_data = json!({
            "status": SubscriptionStatus::PastDue,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/subscriptions?stripe_subscription_id=eq.{}",
            subscription_id
        );
        let _: Vec<Value> = self
            .supabase
            .service_request(Method::PATCH, &path, Some(update_data), None)
            .await?;

        Ok(())
    }
}

fn hex_decode(input: &str) -> Result<Vec<u8>> {
    if !input.is_ascii() || input.len() % 2 != 0 {
        return Err(anyhow!("Malformed hex string"));
    }
    (0..input.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&input[i..i + 2], 16).map_err(|e| anyhow!("Invalid hex: {}", e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::StripeTestUtils;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn valid_signature_passes() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = StripeTestUtils::sign_payload(payload, SECRET, now);

        assert!(WebhookService::verify_signature_at(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let payload = r#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = StripeTestUtils::sign_payload(payload, SECRET, now);

        let result =
            WebhookService::verify_signature_at(r#"{"type":"evil"}"#, &header, SECRET, now);
        assert!(result.is_err());
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = "{}";
        let now = 1_700_000_000;
        let header = StripeTestUtils::sign_payload(payload, "whsec_other", now);

        assert!(WebhookService::verify_signature_at(payload, &header, SECRET, now).is_err());
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let payload = "{}";
        let signed_at = 1_700_000_000;
        let header = StripeTestUtils::sign_payload(payload, SECRET, signed_at);

        let result = WebhookService::verify_signature_at(
            payload,
            &header,
            SECRET,
            signed_at + SIGNATURE_TOLERANCE_SECS + 1,
        );
        let err = result.expect_err("stale delivery must be rejected");
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn header_without_v1_is_rejected() {
        let result =
            WebhookService::verify_signature_at("{}", "t=1700000000", SECRET, 1_700_000_000);
        assert!(result.is_err());
    }
}
