//! Viewing and replacing the stored documents of a client.

use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::errors::AppError;
use crate::models::{Client, UploadResponse};
use crate::services::client_service;
use crate::services::document_store::DocumentStore;
use crate::utils::filenames;

const PDF_CONTENT_TYPES: &[&str] = &["application/pdf", "application/octet-stream"];

/// A stored PDF ready to be served inline.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn validate_pdf_upload(content_type: Option<&str>, bytes: &[u8]) -> Result<(), AppError> {
    let content_type = content_type.unwrap_or("application/octet-stream");
    let essence = content_type.split(';').next().unwrap_or("").trim();
    if !PDF_CONTENT_TYPES.contains(&essence) {
        return Err(AppError::Validation("Uploaded file must be a PDF".to_string()));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    Ok(())
}

pub fn b1_candidates(client: &Client) -> Vec<String> {
    vec![
        filenames::B1_EDITED.to_string(),
        filenames::b1_generated_name(client.first_name.as_deref(), client.last_name.as_deref()),
    ]
}

pub fn kit_candidates(client_id: i64, new_product_id: i64) -> Vec<String> {
    vec![
        filenames::kit_edited_name(new_product_id),
        filenames::kit_generated_name(client_id, new_product_id),
    ]
}

pub fn advice_name(client: &Client) -> String {
    let display = if client.full_name.trim().is_empty() {
        client.id_number.as_str()
    } else {
        client.full_name.as_str()
    };
    filenames::advice_pdf_name(client.id, display)
}

async fn save_upload(
    store: &DocumentStore,
    client: &Client,
    name: &str,
    content_type: Option<&str>,
    bytes: &[u8],
    detail: &str,
) -> Result<UploadResponse, AppError> {
    validate_pdf_upload(content_type, bytes)?;
    store.write(client, name, bytes).await?;
    info!(client_id = client.id, file = %name, "Document uploaded");
    Ok(UploadResponse {
        detail: detail.to_string(),
        filename: name.to_string(),
    })
}

pub async fn advice_pdf(pool: &PgPool, store: &DocumentStore, client_id: i64) -> Result<PdfDocument, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    let name = advice_name(&client);
    let bytes = store
        .read(&client, &name)
        .await?
        .ok_or(AppError::NotFound("Advice PDF not found for client".to_string()))?;
    Ok(PdfDocument { filename: name, bytes })
}

pub async fn upload_advice_pdf(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<UploadResponse, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    let name = advice_name(&client);
    save_upload(store, &client, &name, content_type, bytes, "Advice PDF uploaded").await
}

pub async fn b1_pdf(pool: &PgPool, store: &DocumentStore, client_id: i64) -> Result<PdfDocument, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    let (_, bytes) = store
        .read_first(&client, &b1_candidates(&client))
        .await?
        .ok_or(AppError::NotFound("B1 PDF not found for client".to_string()))?;
    Ok(PdfDocument {
        filename: filenames::download_name("b1", &client.id_number, client.id, ""),
        bytes,
    })
}

pub async fn upload_b1_pdf(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<UploadResponse, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    save_upload(store, &client, filenames::B1_EDITED, content_type, bytes, "B1 PDF uploaded").await
}

async fn client_and_product(pool: &PgPool, client_id: i64, new_product_id: i64) -> Result<Client, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    match db::new_product_queries::fetch_one(pool, new_product_id).await? {
        Some(product) if product.client_id == client.id => Ok(client),
        _ => Err(AppError::NotFound("New product not found".to_string())),
    }
}

pub async fn kit_pdf(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    new_product_id: i64,
) -> Result<PdfDocument, AppError> {
    let client = client_and_product(pool, client_id, new_product_id).await?;
    let (_, bytes) = store
        .read_first(&client, &kit_candidates(client.id, new_product_id))
        .await?
        .ok_or(AppError::NotFound("Kit PDF not found for client and product".to_string()))?;
    Ok(PdfDocument {
        filename: filenames::kit_generated_name(client.id, new_product_id),
        bytes,
    })
}

pub async fn upload_kit_pdf(
    pool: &PgPool,
    store: &DocumentStore,
    client_id: i64,
    new_product_id: i64,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<UploadResponse, AppError> {
    let client = client_and_product(pool, client_id, new_product_id).await?;
    let name = filenames::kit_edited_name(new_product_id);
    save_upload(store, &client, &name, content_type, bytes, "Kit PDF uploaded").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard_service::fixtures::client;

    #[test]
    fn test_upload_accepts_pdf_and_octet_stream() {
        assert!(validate_pdf_upload(Some("application/pdf"), b"%PDF").is_ok());
        assert!(validate_pdf_upload(Some("application/octet-stream"), b"%PDF").is_ok());
        assert!(validate_pdf_upload(None, b"%PDF").is_ok());
        assert!(validate_pdf_upload(Some("image/png"), b"png").is_err());
        assert!(validate_pdf_upload(Some("application/pdf"), b"").is_err());
    }

    #[test]
    fn test_edited_documents_come_first() {
        let mut c = client(5, "Dana Cohen");
        c.first_name = Some("Dana".into());
        c.last_name = Some("Cohen".into());
        assert_eq!(b1_candidates(&c), vec!["b1_edited.pdf", "יפוי כח עבור Dana Cohen.pdf"]);
        assert_eq!(kit_candidates(5, 12), vec!["kit_12_edited.pdf", "kit_5_12.pdf"]);
    }

    #[test]
    fn test_advice_name_falls_back_to_id_number() {
        let mut c = client(9, "Dana Cohen");
        assert_eq!(advice_name(&c), "justification_Dana_Cohen.pdf");
        c.full_name = " ".into();
        c.id_number = "12345".into();
        assert_eq!(advice_name(&c), "justification_12345.pdf");
    }
}
