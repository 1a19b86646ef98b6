use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_clinic_id;

use crate::models::{CreateCheckoutRequest, CreatePortalRequest};
use crate::services::{StripeClient, SubscriptionService, WebhookService};

#[axum::debug_handler]
pub async fn create_checkout_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(_auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let stripe = StripeClient::new(&config);

    let session = stripe
        .create_checkout_session(
            clinic_id,
            &request.price_id,
            &request.success_url,
            &request.cancel_url,
        )
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn create_portal_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePortalRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;

    let subscription_service = SubscriptionService::new(&config);
    let customer_id = subscription_service
        .require_customer_id(clinic_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    let stripe = StripeClient::new(&config);
    let session = stripe
        .create_portal_session(&customer_id, &request.return_url)
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn get_subscription(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = SubscriptionService::new(&config);

    let (subscription, decision) = service
        .access_decision(clinic_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "subscription": subscription,
        "access": decision
    })))
}

/// Stripe webhook receiver. Public route: authentication is the
/// signature over the raw body, checked before anything is parsed.
#[axum::debug_handler]
pub async fn stripe_webhook(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    let service = WebhookService::new(&config);

    service
        .verify_signature(&body, signature)
        .map_err(|e| AppError::Auth(e.to_string()))?;

    let event: Value = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    service
        .handle_event(&event)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!({ "received": true })))
}
