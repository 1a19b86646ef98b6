use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_clinic_router(config: Arc<AppConfig>) -> Router {
    let protected = Router::new()
        .route("/", post(create_clinic))
        .route("/{id}", get(get_clinic))
        .route("/{id}", patch(update_clinic))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    // Subdomain check serves the onboarding page before any account exists.
    Router::new()
        .route("/subdomain-check", get(check_subdomain))
        .merge(protected)
        .with_state(config)
}
