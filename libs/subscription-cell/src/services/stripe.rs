use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{CheckoutSessionResponse, PortalSessionResponse, SubscriptionError};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Thin client over the two Stripe endpoints this backend drives. The
/// Stripe API takes form-encoded bodies, not JSON.
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.stripe_secret_key.clone(),
            base_url: STRIPE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(config: &AppConfig, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.stripe_secret_key.clone(),
            base_url: base_url.to_string(),
        }
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Value> {
        if self.secret_key.is_empty() {
            return Err(anyhow!(SubscriptionError::Stripe(
                "Stripe secret key is not configured".to_string()
            )));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Posting to Stripe: {}", path);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Stripe API error ({}): {}", status, error_text);
            return Err(anyhow!(SubscriptionError::Stripe(error_text)));
        }

        let data = response.json::<Value>().await?;
        Ok(data)
    }

    /// Create a subscription-mode Checkout session. The clinic id rides
    /// in metadata so the webhook can attribute the completed session.
    pub async fn create_checkout_session(
        &self,
        clinic_id: Uuid,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSessionResponse> {
        let clinic = clinic_id.to_string();
        let form = [
            ("mode", "subscription"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[clinic_id]", clinic.as_str()),
            ("subscription_data[metadata][clinic_id]", clinic.as_str()),
        ];

        let session = self.post_form("/v1/checkout/sessions", &form).await?;

        let session_id = session["id"]
            .as_str()
            .ok_or_else(|| anyhow!("Checkout session response missing id"))?
            .to_string();
        let url = session["url"]
            .as_str()
            .ok_or_else(|| anyhow!("Checkout session response missing url"))?
            .to_string();

        Ok(CheckoutSessionResponse { session_id, url })
    }

    /// Billing-portal session for an existing customer.
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSessionResponse> {
        let form = [("customer", customer_id), ("return_url", return_url)];

        let session = self.post_form("/v1/billing_portal/sessions", &form).await?;

        let url = session["url"]
            .as_str()
            .ok_or_else(|| anyhow!("Portal session response missing url"))?
            .to_string();

        Ok(PortalSessionResponse { url })
    }
}
