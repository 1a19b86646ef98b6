use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_inventory_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/medications", post(create_medication))
        .route("/medications", get(list_medications))
        .route("/medications/low-stock", get(low_stock_report))
        .route("/medications/{id}", get(get_medication))
        .route("/medications/{id}", patch(update_medication))
        .route("/medications/{id}/receipts", post(receive_stock))
        .route("/medications/{id}/adjust", post(adjust_stock))
        .route("/medications/{id}/recalculate", post(recalculate_costs))
        .route("/medications/{id}/cost-history", get(cost_history))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
