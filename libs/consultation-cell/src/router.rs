use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_consultation_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(start_session))
        .route("/", get(list_sessions))
        .route("/{id}", get(get_session))
        .route("/{id}/notes", post(update_notes))
        .route("/{id}/complete", post(complete_session))
        .route("/{id}/notes/cleanup", post(cleanup_notes))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
