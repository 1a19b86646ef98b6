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

use crate::models::{
    AdjustStockRequest, CreateMedicationRequest, ReceiveStockRequest, UpdateMedicationRequest,
};
use crate::services::MedicationService;

fn map_inventory_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("below zero") {
        AppError::Conflict(message)
    } else if message.contains("must be") || message.contains("cannot be") {
        AppError::ValidationError(message)
    } else {
        AppError::Internal(message)
    }
}

#[axum::debug_handler]
pub async fn create_medication(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMedicationRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medication = service
        .create_medication(clinic_id, request, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn get_medication(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medication = service
        .get_medication(clinic_id, &medication_id, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn list_medications(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medications = service
        .list_medications(clinic_id, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!({
        "medications": medications,
        "total": medications.len()
    })))
}

#[axum::debug_handler]
pub async fn update_medication(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<String>,
    Json(request): Json<UpdateMedicationRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medication = service
        .update_medication(clinic_id, &medication_id, request, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn receive_stock(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<String>,
    Json(request): Json<ReceiveStockRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medication = service
        .receive_stock(clinic_id, &medication_id, request, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn adjust_stock(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<String>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medication = service
        .adjust_stock(clinic_id, &medication_id, request, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!(medication)))
}

#[axum::debug_handler]
pub async fn recalculate_costs(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let recalculation = service
        .recalculate_costs(clinic_id, &medication_id, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!({
        "stock_on_hand": recalculation.stock_on_hand,
        "average_cost": recalculation.average_cost,
        "history": recalculation.history
    })))
}

#[axum::debug_handler]
pub async fn cost_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(medication_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let recalculation = service
        .cost_history(clinic_id, &medication_id, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!({
        "history": recalculation.history,
        "stock_on_hand": recalculation.stock_on_hand,
        "average_cost": recalculation.average_cost
    })))
}

#[axum::debug_handler]
pub async fn low_stock_report(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = MedicationService::new(&config);

    let medications = service
        .low_stock_report(clinic_id, auth.token())
        .await
        .map_err(map_inventory_error)?;

    Ok(Json(json!({
        "medications": medications,
        "total": medications.len()
    })))
}
