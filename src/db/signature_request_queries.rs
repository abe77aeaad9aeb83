use sqlx::PgPool;

use crate::models::{SignatureRequest, STATUS_PENDING, STATUS_SIGNED};

const SIGNATURE_REQUEST_COLUMNS: &str =
    "id, client_id, token, packet_filename, signed_packet_filename, status, created_at, signed_at";

pub async fn create(
    pool: &PgPool,
    client_id: i64,
    token: &str,
    packet_filename: &str,
) -> Result<SignatureRequest, sqlx::Error> {
    sqlx::query_as::<_, SignatureRequest>(&format!(
        "INSERT INTO client_signature_request (client_id, token, packet_filename)
         VALUES ($1, $2, $3)
         RETURNING {}",
        SIGNATURE_REQUEST_COLUMNS
    ))
    .bind(client_id)
    .bind(token)
    .bind(packet_filename)
    .fetch_one(pool)
    .await
}

pub async fn fetch_by_token(pool: &PgPool, token: &str) -> Result<Option<SignatureRequest>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRequest>(&format!(
        "SELECT {} FROM client_signature_request WHERE token = $1",
        SIGNATURE_REQUEST_COLUMNS
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
}

/// Completes a pending request; `None` when it was already completed.
pub async fn mark_signed(
    pool: &PgPool,
    id: i64,
    signed_packet_filename: &str,
) -> Result<Option<SignatureRequest>, sqlx::Error> {
    sqlx::query_as::<_, SignatureRequest>(&format!(
        "UPDATE client_signature_request
         SET status = $2, signed_at = NOW(), signed_packet_filename = $3
         WHERE id = $1 AND status = $4
         RETURNING {}",
        SIGNATURE_REQUEST_COLUMNS
    ))
    .bind(id)
    .bind(STATUS_SIGNED)
    .bind(signed_packet_filename)
    .bind(STATUS_PENDING)
    .fetch_optional(pool)
    .await
}
