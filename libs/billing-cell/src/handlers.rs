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

use crate::models::{
    ClaimListQuery, CreateClaimRequest, CreateInvoiceRequest, CreatePanelRequest,
    InvoiceListQuery, RecordPaymentRequest, TransitionClaimRequest, UpdatePanelRequest,
};
use crate::services::{ClaimService, InvoiceService, PanelService};

fn map_billing_error(e: anyhow::Error) -> AppError {
    let message = e.to_string();
    if message.contains("not found") {
        AppError::NotFound(message)
    } else if message.contains("not permitted") {
        AppError::Conflict(message)
    } else if message.contains("Validation") || message.contains("must") || message.contains("Cannot")
    {
        AppError::ValidationError(message)
    } else {
        AppError::Internal(message)
    }
}

// ==============================================================================
// INVOICES
// ==============================================================================

#[axum::debug_handler]
pub async fn create_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = InvoiceService::new(&config);

    let invoice = service
        .create_invoice(clinic_id, request, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn get_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = InvoiceService::new(&config);

    let invoice = service
        .get_invoice(clinic_id, &invoice_id, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn list_invoices(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = InvoiceService::new(&config);

    let invoices = service
        .list_invoices(clinic_id, query, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "invoices": invoices,
        "total": invoices.len()
    })))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<String>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = InvoiceService::new(&config);

    let invoice = service
        .record_payment(clinic_id, &invoice_id, request, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn void_invoice(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(invoice_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = InvoiceService::new(&config);

    let invoice = service
        .void_invoice(clinic_id, &invoice_id, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(invoice)))
}

// ==============================================================================
// PANELS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_panel(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePanelRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = PanelService::new(&config);

    let panel = service
        .create_panel(clinic_id, request, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(panel)))
}

#[axum::debug_handler]
pub async fn get_panel(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(panel_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = PanelService::new(&config);

    let panel = service
        .get_panel(clinic_id, &panel_id, auth.token())
        .await
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(json!(panel)))
}

#[axum::debug_handler]
pub async fn list_panels(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = PanelService::new(&config);

    let panels = service
        .list_panels(clinic_id, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "panels": panels,
        "total": panels.len()
    })))
}

#[axum::debug_handler]
pub async fn update_panel(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(panel_id): Path<String>,
    Json(request): Json<UpdatePanelRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = PanelService::new(&config);

    let panel = service
        .update_panel(clinic_id, &panel_id, request, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(panel)))
}

// ==============================================================================
// PANEL CLAIMS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_claim(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClaimRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ClaimService::new(&config);

    let claim = service
        .create_claim(clinic_id, request, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(claim)))
}

#[axum::debug_handler]
pub async fn get_claim(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(claim_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ClaimService::new(&config);

    let claim = service
        .get_claim(clinic_id, &claim_id, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(claim)))
}

#[axum::debug_handler]
pub async fn list_claims(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ClaimListQuery>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ClaimService::new(&config);

    let claims = service
        .list_claims(clinic_id, query, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "claims": claims,
        "total": claims.len()
    })))
}

#[axum::debug_handler]
pub async fn transition_claim(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(claim_id): Path<String>,
    Json(request): Json<TransitionClaimRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic_id = require_clinic_id(&user)?;
    let service = ClaimService::new(&config);

    let claim = service
        .transition_claim(clinic_id, &claim_id, request, auth.token())
        .await
        .map_err(map_billing_error)?;

    Ok(Json(json!(claim)))
}
