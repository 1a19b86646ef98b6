use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::create_appointment_router;
use billing_cell::router::create_billing_router;
use clinic_cell::router::create_clinic_router;
use consultation_cell::router::create_consultation_router;
use inventory_cell::router::create_inventory_router;
use patient_cell::router::create_patient_router;
use queue_cell::router::create_queue_router;
use shared_config::AppConfig;
use subscription_cell::router::{create_subscription_router, create_webhook_router};

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let health = Router::new()
        .route("/healthz", get(health_check))
        .with_state(state.clone());

    Router::new()
        .route("/", get(|| async { "Clinicore API is running!" }))
        .merge(health)
        .nest("/clinics", create_clinic_router(state.clone()))
        .nest("/patients", create_patient_router(state.clone()))
        .nest("/appointments", create_appointment_router(state.clone()))
        .nest("/queue", create_queue_router(state.clone()))
        .nest("/consultations", create_consultation_router(state.clone()))
        .nest("/billing", create_billing_router(state.clone()))
        .nest("/inventory", create_inventory_router(state.clone()))
        .nest("/subscription", create_subscription_router(state.clone()))
        .nest("/webhooks", create_webhook_router(state))
}

/// Config readiness, not liveness: reports which integrations are wired.
async fn health_check(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": if config.is_configured() { "ok" } else { "degraded" },
        "database_configured": config.is_configured(),
        "stripe_configured": config.is_stripe_configured(),
    }))
}
