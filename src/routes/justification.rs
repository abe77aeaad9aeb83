use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use http::StatusCode;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    CreateExistingProduct, CreateFormInstance, CreateNewProduct, ExistingProduct, FormInstance, MarketMatchRequest,
    MarketMatchResponse, NewProduct, SavingProduct, UpdateExistingProduct,
};
use crate::routes::{documents, signing};
use crate::services::justification_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/saving-products", get(list_saving_products))
        .route(
            "/clients/:id/existing-products",
            get(list_existing_products).post(create_existing_product),
        )
        .route(
            "/clients/:id/existing-products/:pid/market-match",
            get(match_existing_product),
        )
        .route(
            "/existing-products/:id",
            patch(update_existing_product).delete(delete_existing_product),
        )
        .route("/clients/:id/new-products", get(list_new_products).post(create_new_product))
        .route("/new-products/:id", delete(delete_new_product))
        .route(
            "/new-products/:id/form-instances",
            get(list_form_instances).post(create_form_instance),
        )
        .route("/form-instances/:id", delete(delete_form_instance))
        .route("/market-match", post(market_match))
        .merge(documents::router())
        .merge(signing::router())
}

pub async fn list_saving_products(State(state): State<AppState>) -> Result<Json<Vec<SavingProduct>>, AppError> {
    info!("GET /justification/saving-products - Fetching catalog");
    let products = justification_service::list_saving_products(&state.pool).await.map_err(|e| {
        error!("Failed to fetch saving products: {}", e);
        e
    })?;
    Ok(Json(products))
}

pub async fn list_existing_products(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ExistingProduct>>, AppError> {
    info!("GET /justification/clients/{}/existing-products - Building holdings view", id);
    let products = justification_service::existing_view(&state.pool, id).await.map_err(|e| {
        error!("Failed to build existing products for client {}: {}", id, e);
        e
    })?;
    Ok(Json(products))
}

pub async fn create_existing_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<CreateExistingProduct>,
) -> Result<(StatusCode, Json<ExistingProduct>), AppError> {
    info!("POST /justification/clients/{}/existing-products - Creating existing product", id);
    let product = justification_service::create_existing(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to create existing product for client {}: {}", id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_existing_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<UpdateExistingProduct>,
) -> Result<Json<ExistingProduct>, AppError> {
    info!("PATCH /justification/existing-products/{} - Updating existing product", id);
    let product = justification_service::update_existing(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to update existing product {}: {}", id, e);
        e
    })?;
    Ok(Json(product))
}

pub async fn delete_existing_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /justification/existing-products/{} - Deleting existing product", id);
    justification_service::delete_existing(&state.pool, id).await.map_err(|e| {
        error!("Failed to delete existing product {}: {}", id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_new_products(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<NewProduct>>, AppError> {
    info!("GET /justification/clients/{}/new-products - Fetching new products", id);
    let products = justification_service::list_new_products(&state.pool, id).await.map_err(|e| {
        error!("Failed to fetch new products for client {}: {}", id, e);
        e
    })?;
    Ok(Json(products))
}

pub async fn create_new_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<CreateNewProduct>,
) -> Result<(StatusCode, Json<NewProduct>), AppError> {
    info!("POST /justification/clients/{}/new-products - Creating new product", id);
    let product = justification_service::create_new_product(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to create new product for client {}: {}", id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn delete_new_product(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    info!("DELETE /justification/new-products/{} - Deleting new product", id);
    justification_service::delete_new_product(&state.pool, id).await.map_err(|e| {
        error!("Failed to delete new product {}: {}", id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_form_instances(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FormInstance>>, AppError> {
    info!("GET /justification/new-products/{}/form-instances - Fetching forms", id);
    let forms = justification_service::list_form_instances(&state.pool, id).await.map_err(|e| {
        error!("Failed to fetch form instances for new product {}: {}", id, e);
        e
    })?;
    Ok(Json(forms))
}

pub async fn create_form_instance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<CreateFormInstance>,
) -> Result<(StatusCode, Json<FormInstance>), AppError> {
    info!("POST /justification/new-products/{}/form-instances - Creating form", id);
    let form = justification_service::create_form_instance(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to create form instance for new product {}: {}", id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(form)))
}

pub async fn delete_form_instance(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    info!("DELETE /justification/form-instances/{} - Deleting form", id);
    justification_service::delete_form_instance(&state.pool, id).await.map_err(|e| {
        error!("Failed to delete form instance {}: {}", id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn market_match(
    State(state): State<AppState>,
    Json(data): Json<MarketMatchRequest>,
) -> Result<Json<MarketMatchResponse>, AppError> {
    info!("POST /justification/market-match - Matching holding against catalog");
    let result = justification_service::match_holding(&state.pool, data).await.map_err(|e| {
        error!("Failed to match holding: {}", e);
        e
    })?;
    Ok(Json(result))
}

pub async fn match_existing_product(
    State(state): State<AppState>,
    Path((id, pid)): Path<(i64, i64)>,
) -> Result<Json<MarketMatchResponse>, AppError> {
    info!("GET /justification/clients/{}/existing-products/{}/market-match - Matching holding", id, pid);
    let result = justification_service::match_existing(&state.pool, id, pid).await.map_err(|e| {
        error!("Failed to match existing product {} for client {}: {}", pid, id, e);
        e
    })?;
    Ok(Json(result))
}
