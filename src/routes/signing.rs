use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::{SignatureSubmit, SignatureSubmitResponse};
use crate::routes::{html_response, pdf_response};
use crate::services::signing_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/client-sign/:token", get(sign_page))
        .route("/client-sign/:token/packet.pdf", get(packet_pdf))
        .route("/client-sign/:token/submit", post(submit))
}

// Tokens are credentials; only a prefix is logged.
fn token_prefix(token: &str) -> &str {
    token.get(..6).unwrap_or(token)
}

pub async fn sign_page(State(state): State<AppState>, Path(token): Path<String>) -> Result<Response, AppError> {
    info!("GET /justification/client-sign/{}… - Rendering signing page", token_prefix(&token));
    let html = signing_service::sign_page(&state.pool, &token).await.map_err(|e| {
        warn!("Signing page unavailable: {}", e);
        e
    })?;
    Ok(html_response(html))
}

pub async fn packet_pdf(State(state): State<AppState>, Path(token): Path<String>) -> Result<Response, AppError> {
    info!("GET /justification/client-sign/{}…/packet.pdf - Serving packet for signing", token_prefix(&token));
    let document = signing_service::packet_for_signing(&state.pool, &state.documents, &token)
        .await
        .map_err(|e| {
            warn!("Packet for signing unavailable: {}", e);
            e
        })?;
    Ok(pdf_response(document))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(data): Json<SignatureSubmit>,
) -> Result<Json<SignatureSubmitResponse>, AppError> {
    info!("POST /justification/client-sign/{}…/submit - Submitting signature", token_prefix(&token));
    let response = signing_service::submit_signature(&state.pool, &state.documents, &token, &data.signature_data_url)
        .await
        .map_err(|e| {
            error!("Failed to submit signature: {}", e);
            e
        })?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_prefix_is_bounded() {
        assert_eq!(token_prefix("abcdefghij"), "abcdef");
        assert_eq!(token_prefix("abc"), "abc");
    }
}
