use sqlx::PgPool;
use tracing::warn;

use crate::db;
use crate::errors::AppError;
use crate::models::{ClearCrmDataResult, ClearJustificationDataResult};

/// Removes snapshots and notes; clients stay.
pub async fn clear_crm_data(pool: &PgPool) -> Result<ClearCrmDataResult, AppError> {
    let mut tx = pool.begin().await?;
    let deleted_snapshots = db::snapshot_queries::delete_all(&mut *tx).await?;
    let deleted_client_notes = db::note_queries::delete_all(&mut *tx).await?;
    tx.commit().await?;

    warn!(deleted_snapshots, deleted_client_notes, "CRM data cleared");
    Ok(ClearCrmDataResult {
        deleted_snapshots: deleted_snapshots as i64,
        deleted_client_notes: deleted_client_notes as i64,
    })
}

/// Removes forms, new, existing and catalog products, children first.
pub async fn clear_justification_data(pool: &PgPool) -> Result<ClearJustificationDataResult, AppError> {
    let mut tx = pool.begin().await?;
    let deleted_form_instances = db::form_instance_queries::delete_all(&mut *tx).await?;
    let deleted_new_products = db::new_product_queries::delete_all(&mut *tx).await?;
    let deleted_existing_products = db::existing_product_queries::delete_all(&mut *tx).await?;
    let deleted_saving_products = db::saving_product_queries::delete_all(&mut *tx).await?;
    tx.commit().await?;

    warn!(
        deleted_form_instances,
        deleted_new_products, deleted_existing_products, deleted_saving_products, "Justification data cleared"
    );
    Ok(ClearJustificationDataResult {
        deleted_saving_products: deleted_saving_products as i64,
        deleted_existing_products: deleted_existing_products as i64,
        deleted_new_products: deleted_new_products as i64,
        deleted_form_instances: deleted_form_instances as i64,
    })
}
