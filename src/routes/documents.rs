use axum::extract::{Multipart, Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{PacketQuery, PacketTrimRequest, PacketTrimResponse, SignRequestResponse, UploadResponse};
use crate::routes::{html_response, pdf_response, read_upload};
use crate::services::{advice_service, document_service, packet_service, signing_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients/:id/advice.html", get(advice_html))
        .route("/clients/:id/advice.pdf", get(advice_pdf))
        .route("/clients/:id/advice-upload", post(upload_advice))
        .route("/clients/:id/b1.pdf", get(b1_pdf))
        .route("/clients/:id/b1-upload", post(upload_b1))
        .route("/clients/:id/new-products/:new_product_id/kit.pdf", get(kit_pdf))
        .route("/clients/:id/new-products/:new_product_id/kit-upload", post(upload_kit))
        .route("/clients/:id/packet.pdf", get(packet_pdf))
        .route("/clients/:id/packet-upload", post(upload_packet))
        .route("/clients/:id/packet-trim", post(trim_packet))
        .route("/clients/:id/packet-signed-client.pdf", get(signed_packet_pdf))
        .route("/clients/:id/packet-sign-request", post(create_sign_request))
}

pub async fn advice_html(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    info!("GET /justification/clients/{}/advice.html - Rendering advice", id);
    let html = advice_service::advice_html(&state.pool, &state.documents, id).await.map_err(|e| {
        error!("Failed to render advice for client {}: {}", id, e);
        e
    })?;
    Ok(html_response(html))
}

pub async fn advice_pdf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    info!("GET /justification/clients/{}/advice.pdf - Fetching advice PDF", id);
    let document = document_service::advice_pdf(&state.pool, &state.documents, id).await.map_err(|e| {
        error!("Failed to fetch advice PDF for client {}: {}", id, e);
        e
    })?;
    Ok(pdf_response(document))
}

pub async fn upload_advice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    info!("POST /justification/clients/{}/advice-upload - Storing advice PDF", id);
    let upload = read_upload(multipart).await?;
    let response = document_service::upload_advice_pdf(
        &state.pool,
        &state.documents,
        id,
        upload.content_type.as_deref(),
        &upload.bytes,
    )
    .await
    .map_err(|e| {
        error!("Failed to store advice PDF for client {}: {}", id, e);
        e
    })?;
    Ok(Json(response))
}

pub async fn b1_pdf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    info!("GET /justification/clients/{}/b1.pdf - Fetching B1 PDF", id);
    let document = document_service::b1_pdf(&state.pool, &state.documents, id).await.map_err(|e| {
        error!("Failed to fetch B1 PDF for client {}: {}", id, e);
        e
    })?;
    Ok(pdf_response(document))
}

pub async fn upload_b1(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    info!("POST /justification/clients/{}/b1-upload - Storing B1 PDF", id);
    let upload = read_upload(multipart).await?;
    let response = document_service::upload_b1_pdf(
        &state.pool,
        &state.documents,
        id,
        upload.content_type.as_deref(),
        &upload.bytes,
    )
    .await
    .map_err(|e| {
        error!("Failed to store B1 PDF for client {}: {}", id, e);
        e
    })?;
    Ok(Json(response))
}

pub async fn kit_pdf(
    State(state): State<AppState>,
    Path((id, new_product_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    info!("GET /justification/clients/{}/new-products/{}/kit.pdf - Fetching kit", id, new_product_id);
    let document = document_service::kit_pdf(&state.pool, &state.documents, id, new_product_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch kit {} for client {}: {}", new_product_id, id, e);
            e
        })?;
    Ok(pdf_response(document))
}

pub async fn upload_kit(
    State(state): State<AppState>,
    Path((id, new_product_id)): Path<(i64, i64)>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    info!("POST /justification/clients/{}/new-products/{}/kit-upload - Storing kit", id, new_product_id);
    let upload = read_upload(multipart).await?;
    let response = document_service::upload_kit_pdf(
        &state.pool,
        &state.documents,
        id,
        new_product_id,
        upload.content_type.as_deref(),
        &upload.bytes,
    )
    .await
    .map_err(|e| {
        error!("Failed to store kit {} for client {}: {}", new_product_id, id, e);
        e
    })?;
    Ok(Json(response))
}

pub async fn packet_pdf(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PacketQuery>,
) -> Result<Response, AppError> {
    info!("GET /justification/clients/{}/packet.pdf - Fetching packet (generate={})", id, query.generate);
    let document = packet_service::packet_pdf(&state.pool, &state.documents, id, query.generate)
        .await
        .map_err(|e| {
            error!("Failed to fetch packet for client {}: {}", id, e);
            e
        })?;
    Ok(pdf_response(document))
}

pub async fn upload_packet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    info!("POST /justification/clients/{}/packet-upload - Storing edited packet", id);
    let upload = read_upload(multipart).await?;
    let response = packet_service::upload_packet(
        &state.pool,
        &state.documents,
        id,
        upload.content_type.as_deref(),
        &upload.bytes,
    )
    .await
    .map_err(|e| {
        error!("Failed to store packet for client {}: {}", id, e);
        e
    })?;
    Ok(Json(response))
}

pub async fn trim_packet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<PacketTrimRequest>,
) -> Result<Json<PacketTrimResponse>, AppError> {
    info!("POST /justification/clients/{}/packet-trim - Removing pages {:?}", id, data.pages_to_remove);
    let response = packet_service::trim_packet(&state.pool, &state.documents, id, &data.pages_to_remove)
        .await
        .map_err(|e| {
            error!("Failed to trim packet for client {}: {}", id, e);
            e
        })?;
    Ok(Json(response))
}

pub async fn signed_packet_pdf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    info!("GET /justification/clients/{}/packet-signed-client.pdf - Fetching signed packet", id);
    let document = packet_service::signed_packet_pdf(&state.pool, &state.documents, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch signed packet for client {}: {}", id, e);
            e
        })?;
    Ok(pdf_response(document))
}

pub async fn create_sign_request(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SignRequestResponse>, AppError> {
    info!("POST /justification/clients/{}/packet-sign-request - Creating signing link", id);
    let response = signing_service::create_request(
        &state.pool,
        &state.documents,
        state.config.public_base_url.as_deref(),
        id,
    )
    .await
    .map_err(|e| {
        error!("Failed to create signing link for client {}: {}", id, e);
        e
    })?;
    Ok(Json(response))
}
