pub(crate) mod admin;
pub(crate) mod crm;
pub(crate) mod documents;
pub(crate) mod health;
pub(crate) mod justification;
pub(crate) mod signing;

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::response::{Html, IntoResponse, Response};
use http::header;

use crate::errors::AppError;
use crate::services::document_service::PdfDocument;

/// One uploaded file plus the plain form fields sent alongside it.
#[derive(Debug, Default)]
pub(crate) struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

impl Upload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
    }
}

/// Reads a multipart body; the part named `file` is the upload.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            upload.filename = field.file_name().map(str::to_string);
            upload.content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read uploaded file: {}", e)))?;
            upload.bytes = data.to_vec();
            has_file = true;
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid form field {}: {}", name, e)))?;
            upload.fields.insert(name, value);
        }
    }

    if !has_file {
        return Err(AppError::Validation("Missing uploaded file".to_string()));
    }
    Ok(upload)
}

pub(crate) fn pdf_response(document: PdfDocument) -> Response {
    let disposition = format!("inline; filename=\"{}\"", document.filename);
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response()
}

pub(crate) fn html_response(body: String) -> Response {
    Html(body).into_response()
}
