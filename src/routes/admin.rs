use axum::extract::{Multipart, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{ClearCrmDataResult, ClearJustificationDataResult, CrmImportResult, GemelNetImportResult};
use crate::routes::read_upload;
use crate::services::{admin_service, crm_import_service, gemelnet_import_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/import-crm-balances", post(import_crm_balances))
        .route("/import-gemelnet-xml", post(import_gemelnet_xml))
        .route("/clear-crm-data", delete(clear_crm_data))
        .route("/clear-justification-data", delete(clear_justification_data))
}

pub async fn import_crm_balances(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CrmImportResult>, AppError> {
    info!("POST /admin/import-crm-balances - Importing provider balances");
    let upload = read_upload(multipart).await?;
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Empty balance file uploaded".to_string()));
    }

    let result = crm_import_service::import_crm_balances(
        &state.pool,
        &upload.bytes,
        upload.field("snapshot_month"),
        upload.field("company_code"),
        upload.filename.as_deref(),
    )
    .await
    .map_err(|e| {
        error!("CRM balance import failed: {}", e);
        e
    })?;
    info!(
        company = %result.company_code,
        rows = result.rows_processed,
        snapshots = result.created_snapshots,
        "CRM balance import finished"
    );
    Ok(Json(result))
}

pub async fn import_gemelnet_xml(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GemelNetImportResult>, AppError> {
    info!("POST /admin/import-gemelnet-xml - Importing fund catalog");
    let upload = read_upload(multipart).await?;
    if upload.bytes.is_empty() {
        return Err(AppError::Validation("Empty XML file uploaded".to_string()));
    }

    let result = gemelnet_import_service::import_gemelnet_xml(&state.pool, &upload.bytes)
        .await
        .map_err(|e| {
            error!("Gemel-Net import failed: {}", e);
            e
        })?;
    Ok(Json(result))
}

pub async fn clear_crm_data(State(state): State<AppState>) -> Result<Json<ClearCrmDataResult>, AppError> {
    info!("DELETE /admin/clear-crm-data - Clearing snapshots and notes");
    let result = admin_service::clear_crm_data(&state.pool).await.map_err(|e| {
        error!("Failed to clear CRM data: {}", e);
        e
    })?;
    Ok(Json(result))
}

pub async fn clear_justification_data(
    State(state): State<AppState>,
) -> Result<Json<ClearJustificationDataResult>, AppError> {
    info!("DELETE /admin/clear-justification-data - Clearing products and forms");
    let result = admin_service::clear_justification_data(&state.pool).await.map_err(|e| {
        error!("Failed to clear justification data: {}", e);
        e
    })?;
    Ok(Json(result))
}
