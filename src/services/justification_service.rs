use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    CreateExistingProduct, CreateFormInstance, CreateNewProduct, ExistingProduct, FormInstance,
    MarketMatchRequest, MarketMatchResponse, NewProduct, SavingProduct, UpdateExistingProduct,
    DEFAULT_FORM_STATUS,
};
use crate::services::client_service;
use crate::services::existing_product_view::build_existing_view;
use crate::services::fund_matching::{find_matching_saving_product, HoldingFields};

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

pub async fn list_saving_products(pool: &PgPool) -> Result<Vec<SavingProduct>, AppError> {
    let products = db::saving_product_queries::fetch_all(pool).await?;
    Ok(products)
}

pub async fn existing_view(pool: &PgPool, client_id: i64) -> Result<Vec<ExistingProduct>, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let stored = db::existing_product_queries::fetch_for_client(pool, client_id).await?;
    let snapshots = db::snapshot_queries::fetch_active_for_client(pool, client_id).await?;
    let catalog = db::saving_product_queries::fetch_all(pool).await?;
    Ok(build_existing_view(client_id, stored, &snapshots, &catalog))
}

pub async fn create_existing(
    pool: &PgPool,
    client_id: i64,
    input: CreateExistingProduct,
) -> Result<ExistingProduct, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    require_text(&input.personal_number, "Personal number")?;
    let product = db::existing_product_queries::create(pool, client_id, &input).await?;
    Ok(product)
}

pub async fn update_existing(
    pool: &PgPool,
    id: i64,
    input: UpdateExistingProduct,
) -> Result<ExistingProduct, AppError> {
    let mut product = db::existing_product_queries::fetch_one(pool, id)
        .await?
        .ok_or(AppError::NotFound("Existing product not found".to_string()))?;
    input.apply_to(&mut product);
    require_text(&product.personal_number, "Personal number")?;

    let product = db::existing_product_queries::update(pool, &product)
        .await?
        .ok_or(AppError::NotFound("Existing product not found".to_string()))?;
    Ok(product)
}

pub async fn delete_existing(pool: &PgPool, id: i64) -> Result<u64, AppError> {
    match db::existing_product_queries::delete(pool, id).await {
        Ok(0) => Err(AppError::NotFound("Existing product not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn list_new_products(pool: &PgPool, client_id: i64) -> Result<Vec<NewProduct>, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let products = db::new_product_queries::fetch_for_client(pool, client_id).await?;
    Ok(products)
}

/// Creates a replacement product. A negative `existingProductId` refers to a
/// virtual row of the current view; it is persisted first so the link points
/// at a stored record. An unknown virtual id leaves the product unlinked.
pub async fn create_new_product(
    pool: &PgPool,
    client_id: i64,
    input: CreateNewProduct,
) -> Result<NewProduct, AppError> {
    client_service::fetch_one(pool, client_id).await?;

    let mut tx = pool.begin().await?;
    let existing_product_id = match input.existing_product_id {
        None | Some(0) => None,
        Some(id) if id > 0 => {
            let existing = db::existing_product_queries::fetch_one(&mut *tx, id)
                .await?
                .ok_or(AppError::NotFound("Existing product not found".to_string()))?;
            if existing.client_id != client_id {
                return Err(AppError::Forbidden(
                    "Existing product belongs to another client".to_string(),
                ));
            }
            Some(id)
        }
        Some(virtual_id) => {
            let stored = db::existing_product_queries::fetch_for_client(&mut *tx, client_id).await?;
            let snapshots = db::snapshot_queries::fetch_active_for_client(&mut *tx, client_id).await?;
            let catalog = db::saving_product_queries::fetch_all(&mut *tx).await?;
            let view = build_existing_view(client_id, stored, &snapshots, &catalog);

            match view.iter().find(|p| p.id == virtual_id) {
                Some(row) => {
                    let created =
                        db::existing_product_queries::create(&mut *tx, client_id, &CreateExistingProduct::from(row))
                            .await?;
                    info!(
                        client_id,
                        virtual_id,
                        existing_product_id = created.id,
                        "Materialized virtual existing product"
                    );
                    Some(created.id)
                }
                None => None,
            }
        }
    };

    let product = db::new_product_queries::create(&mut *tx, client_id, existing_product_id, &input).await?;
    tx.commit().await?;
    Ok(product)
}

pub async fn delete_new_product(pool: &PgPool, id: i64) -> Result<u64, AppError> {
    match db::new_product_queries::delete(pool, id).await {
        Ok(0) => Err(AppError::NotFound("New product not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn list_form_instances(pool: &PgPool, new_product_id: i64) -> Result<Vec<FormInstance>, AppError> {
    let forms = db::form_instance_queries::fetch_for_new_product(pool, new_product_id).await?;
    Ok(forms)
}

pub async fn create_form_instance(
    pool: &PgPool,
    new_product_id: i64,
    input: CreateFormInstance,
) -> Result<FormInstance, AppError> {
    db::new_product_queries::fetch_one(pool, new_product_id)
        .await?
        .ok_or(AppError::NotFound("New product not found".to_string()))?;
    require_text(&input.template_filename, "Template filename")?;

    let status = input
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FORM_STATUS)
        .to_string();
    let form = db::form_instance_queries::create(pool, new_product_id, &status, &input).await?;
    Ok(form)
}

pub async fn delete_form_instance(pool: &PgPool, id: i64) -> Result<u64, AppError> {
    match db::form_instance_queries::delete(pool, id).await {
        Ok(0) => Err(AppError::NotFound("Form instance not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}

pub(crate) fn market_match(request: &MarketMatchRequest, catalog: &[SavingProduct]) -> MarketMatchResponse {
    let holding = HoldingFields {
        company_name: &request.company_name,
        fund_name: &request.fund_name,
        fund_code: &request.fund_code,
        fund_type: &request.fund_type,
    };
    let found = find_matching_saving_product(holding, catalog);
    let locked = Some(request.fund_type.trim())
        .filter(|t| !t.is_empty())
        .or_else(|| found.map(|m| m.product.fund_type.trim()).filter(|t| !t.is_empty()))
        .map(str::to_string);

    MarketMatchResponse {
        matched: found.map(|m| m.product.clone()),
        score: found.map(|m| m.score),
        locked_fund_type: locked,
    }
}

pub async fn match_holding(pool: &PgPool, request: MarketMatchRequest) -> Result<MarketMatchResponse, AppError> {
    let catalog = db::saving_product_queries::fetch_all(pool).await?;
    Ok(market_match(&request, &catalog))
}

/// Match for one row of the client's view (stored or virtual).
pub async fn match_existing(
    pool: &PgPool,
    client_id: i64,
    existing_product_id: i64,
) -> Result<MarketMatchResponse, AppError> {
    let view = existing_view(pool, client_id).await?;
    let product = view
        .into_iter()
        .find(|p| p.id == existing_product_id)
        .ok_or(AppError::NotFound("Existing product not found".to_string()))?;

    let request = MarketMatchRequest {
        company_name: product.company_name,
        fund_name: product.fund_name,
        fund_code: product.fund_code,
        fund_type: product.fund_type,
    };
    match_holding(pool, request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_match_reports_lock_and_score() {
        let catalog = vec![SavingProduct {
            id: 4,
            fund_type: "השתלמות".into(),
            company_name: "מגדל".into(),
            fund_name: "מגדל השתלמות כללי".into(),
            fund_code: "9604".into(),
            ..Default::default()
        }];
        let request = MarketMatchRequest {
            fund_code: "9604".into(),
            fund_type: " קרן השתלמות ".into(),
            ..Default::default()
        };
        let response = market_match(&request, &catalog);
        assert_eq!(response.matched.map(|p| p.id), Some(4));
        assert_eq!(response.score, Some(90));
        assert_eq!(response.locked_fund_type.as_deref(), Some("קרן השתלמות"));
    }

    #[test]
    fn test_market_match_locks_matched_type_when_holding_has_none() {
        let catalog = vec![SavingProduct {
            id: 4,
            fund_type: "השתלמות".into(),
            company_name: "מגדל".into(),
            fund_name: "מגדל השתלמות כללי".into(),
            fund_code: "9604".into(),
            ..Default::default()
        }];
        let request = MarketMatchRequest {
            fund_code: "9604".into(),
            fund_type: "  ".into(),
            ..Default::default()
        };
        let response = market_match(&request, &catalog);
        assert_eq!(response.matched.map(|p| p.id), Some(4));
        assert_eq!(response.locked_fund_type.as_deref(), Some("השתלמות"));
    }

    #[test]
    fn test_market_match_without_candidates() {
        let response = market_match(&MarketMatchRequest::default(), &[]);
        assert!(response.matched.is_none());
        assert!(response.locked_fund_type.is_none());
    }
}
