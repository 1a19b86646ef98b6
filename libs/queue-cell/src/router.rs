use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_queue_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/check-in", post(check_in))
        .route("/call-next", post(call_next))
        .route("/today", get(list_today))
        .route("/{id}/status", post(update_queue_status))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
