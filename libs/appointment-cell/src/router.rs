use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_appointment_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(book_appointment))
        .route("/", get(list_appointments))
        .route("/{id}", get(get_appointment))
        .route("/{id}/status", post(update_appointment_status))
        .route("/{id}/reschedule", post(reschedule_appointment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
