//! The client packet: advice, B1 and kits merged into one signable PDF.

use std::collections::HashSet;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::db;
use crate::errors::AppError;
use crate::models::{Client, NewProduct, PacketTrimResponse, UploadResponse};
use crate::services::client_service;
use crate::services::document_service::{self, PdfDocument};
use crate::services::document_store::DocumentStore;
use crate::services::pdf_service;
use crate::utils::filenames;

/// One kit per replaced holding (lowest new-product id wins) plus every
/// product that replaces nothing, in new-product id order.
pub fn select_kit_products(products: &[NewProduct]) -> Vec<&NewProduct> {
    let mut sorted: Vec<&NewProduct> = products.iter().collect();
    sorted.sort_by_key(|p| p.id);

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|p| match p.existing_product_id {
            Some(existing_id) => seen.insert(existing_id),
            None => true,
        })
        .collect()
}

/// Stored parts that exist for `client`, in packet order.
async fn collect_parts(
    pool: &PgPool,
    store: &DocumentStore,
    client: &Client,
) -> Result<Vec<(String, Vec<u8>)>, AppError> {
    let mut parts = Vec::new();

    let advice = document_service::advice_name(client);
    if let Some(bytes) = store.read(client, &advice).await? {
        parts.push((advice, bytes));
    }

    if let Some(b1) = store
        .read_first(client, &document_service::b1_candidates(client))
        .await?
    {
        parts.push(b1);
    }

    let products = db::new_product_queries::fetch_for_client(pool, client.id).await?;
    for product in select_kit_products(&products) {
        let candidates = document_service::kit_candidates(client.id, product.id);
        if let Some(kit) = store.read_first(client, &candidates).await? {
            parts.push(kit);
        }
    }
    Ok(parts)
}

/// Merges the available parts and stores the result as the base packet.
pub async fn build_packet(pool: &PgPool, store: &DocumentStore, client: &Client) -> Result<Vec<u8>, AppError> {
    let parts = collect_parts(pool, store, client).await?;
    if parts.is_empty() {
        return Err(AppError::Validation(
            "No PDFs available to build client packet".to_string(),
        ));
    }

    let names: Vec<&str> = parts.iter().map(|(name, _)| name.as_str()).collect();
    info!(client_id = client.id, parts = ?names, "Building client packet");

    let merged = pdf_service::merge(&parts)?;
    store.write(client, &filenames::packet_name(client.id), &merged).await?;
    Ok(merged)
}

fn packet_download(client: &Client, bytes: Vec<u8>) -> PdfDocument {
    PdfDocument {
        filename: filenames::download_name("packet", &client.id_number, client.id, ""),
        bytes,
    }
}

/// Current packet: the edited one when present, else the base packet.
/// `generate` rebuilds the base packet first.
pub async fn packet_pdf(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    generate: bool,
) -> Result<PdfDocument, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    if generate {
        let bytes = build_packet(pool, store, &client).await?;
        return Ok(packet_download(&client, bytes));
    }

    let candidates = current_packet_candidates(client.id);
    let (_, bytes) = store
        .read_first(&client, &candidates)
        .await?
        .ok_or(AppError::NotFound("Client packet PDF not found".to_string()))?;
    Ok(packet_download(&client, bytes))
}

pub fn current_packet_candidates(client_id: i64) -> Vec<String> {
    vec![filenames::packet_edited_name(client_id), filenames::packet_name(client_id)]
}

pub async fn upload_packet(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<UploadResponse, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    document_service::validate_pdf_upload(content_type, bytes)?;
    let name = filenames::packet_edited_name(client.id);
    store.write(&client, &name, bytes).await?;
    Ok(UploadResponse {
        detail: "Client packet PDF uploaded".to_string(),
        filename: name,
    })
}

/// Drops 1-based pages from the current packet and stores the edited copy.
pub async fn trim_packet(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    pages_to_remove: &[i64],
) -> Result<PacketTrimResponse, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    if pages_to_remove.is_empty() {
        return Err(AppError::Validation("No pages specified for removal".to_string()));
    }

    let (source, bytes) = store
        .read_first(&client, &current_packet_candidates(client.id))
        .await?
        .ok_or(AppError::NotFound("Client packet PDF not found".to_string()))?;

    let trimmed = pdf_service::remove_pages(&bytes, pages_to_remove)?;
    let edited = filenames::packet_edited_name(client.id);
    store.write(&client, &edited, &trimmed).await?;
    info!(client_id, source = %source, removed = ?pages_to_remove, "Client packet trimmed");

    Ok(PacketTrimResponse {
        detail: "Client packet PDF trimmed".to_string(),
        edited_filename: edited,
    })
}

pub async fn signed_packet_pdf(pool: &PgPool, store: &DocumentStore, client_id: i64) -> Result<PdfDocument, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    let bytes = store
        .read(&client, &filenames::packet_signed_name(client.id))
        .await?
        .ok_or_else(|| {
            warn!(client_id, "Signed packet requested before signing");
            AppError::NotFound("Signed client packet PDF not found".to_string())
        })?;
    Ok(PdfDocument {
        filename: filenames::download_name("packet", &client.id_number, client.id, "_signed_client"),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, existing: Option<i64>) -> NewProduct {
        NewProduct {
            id,
            client_id: 1,
            existing_product_id: existing,
            ..Default::default()
        }
    }

    #[test]
    fn test_one_kit_per_existing_product() {
        let products = vec![
            product(7, Some(100)),
            product(3, Some(100)),
            product(5, None),
            product(9, Some(200)),
            product(1, None),
        ];
        let ids: Vec<i64> = select_kit_products(&products).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3, 5, 9]);
    }

    #[test]
    fn test_no_products_no_kits() {
        assert!(select_kit_products(&[]).is_empty());
    }

    #[test]
    fn test_edited_packet_is_preferred() {
        assert_eq!(
            current_packet_candidates(4),
            vec!["packet_4_edited.pdf".to_string(), "packet_4.pdf".to_string()]
        );
    }
}
