use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateClinicRequest, SubdomainCheckQuery, UpdateClinicRequest};
use crate::services::{ClinicService, SubdomainService};

#[axum::debug_handler]
pub async fn create_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);

    let clinic = service
        .create_clinic(request, auth.token())
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("already taken") {
                AppError::Conflict(message)
            } else if message.contains("Subdomain") {
                AppError::ValidationError(message)
            } else {
                AppError::Internal(message)
            }
        })?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(clinic_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);

    let clinic = service
        .get_clinic(&clinic_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
    Path(clinic_id): Path<String>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&config);

    let clinic = service
        .update_clinic(&clinic_id, request, auth.token())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(clinic)))
}

/// Public onboarding endpoint: no auth, no tenant context.
#[axum::debug_handler]
pub async fn check_subdomain(
    State(config): State<Arc<AppConfig>>,
    Query(query): Query<SubdomainCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SubdomainService::new(&config);

    let result = service
        .check_availability(&query.subdomain)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(json!(result)))
}
