use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_billing_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/invoices", post(create_invoice))
        .route("/invoices", get(list_invoices))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/{id}/payment", post(record_payment))
        .route("/invoices/{id}/void", post(void_invoice))
        .route("/panels", post(create_panel))
        .route("/panels", get(list_panels))
        .route("/panels/{id}", get(get_panel))
        .route("/panels/{id}", patch(update_panel))
        .route("/claims", post(create_claim))
        .route("/claims", get(list_claims))
        .route("/claims/{id}", get(get_claim))
        .route("/claims/{id}/transition", post(transition_claim))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
