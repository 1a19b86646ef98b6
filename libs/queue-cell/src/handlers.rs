use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_clinic_id;

use crate::models::{CheckInRequest, UpdateQueueStatusRequest};
use crate::services::QueueService;

#[axum::debug_handler]
pub async fn check_in(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = QueueService::new(&config);

    let entry = service
        .check_in(clinic_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn call_next(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = QueueService::new(&config);

    let entry = service
        .call_next(clinic_id, auth.token())
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("empty") {
                AppError::NotFound(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn update_queue_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<String>,
    Json(request): Json<UpdateQueueStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = QueueService::new(&config);

    let entry = service
        .update_status(clinic_id, &entry_id, request, auth.token())
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("not found") {
                AppError::NotFound(message)
            } else if message.contains("not allowed") {
                AppError::Conflict(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn list_today(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = QueueService::new(&config);

    let entries = service
        .list_today(clinic_id, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let waiting = entries
        .iter()
        .filter(|e| e.status == crate::models::QueueStatus::Waiting)
        .count();

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len(),
        "waiting": waiting
    })))
}
