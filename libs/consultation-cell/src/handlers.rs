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
use shared_utils::extractor::require_clinic_id;

use crate::models::{SessionListQuery, StartSessionRequest, UpdateNotesRequest};
use crate::services::{ConsultationService, NotesCleanupService};

fn map_session_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("already completed") || message.contains("no notes") {
        AppError::Conflict(message)
    } else {
        AppError::Internal(message)
    }
}

#[axum::debug_handler]
pub async fn start_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ConsultationService::new(&config);

    let session = service
        .start_session(clinic_id, request, auth.token())
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn get_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ConsultationService::new(&config);

    let session = service
        .get_session(clinic_id, &session_id, auth.token())
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn list_sessions(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ConsultationService::new(&config);

    let sessions = service
        .list_sessions(clinic_id, query, auth.token())
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn update_notes(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ConsultationService::new(&config);

    let session = service
        .update_notes(clinic_id, &session_id, request, auth.token())
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn complete_session(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ConsultationService::new(&config);

    let session = service
        .complete_session(clinic_id, &session_id, auth.token())
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn cleanup_notes(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;

    let service = NotesCleanupService::new(&config)
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    let result = service
        .cleanup_notes(&config, clinic_id, &session_id, auth.token())
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!(result)))
}
