use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_subscription_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(get_subscription))
        .route("/checkout", post(create_checkout_session))
        .route("/portal", post(create_portal_session))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

/// Webhooks authenticate by signature, not bearer token; no auth layer.
pub fn create_webhook_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .with_state(config)
}
