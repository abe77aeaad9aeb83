//! Remote signing of the client packet through a one-time link.

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db;
use crate::errors::AppError;
use crate::models::{
    Client, SignRequestResponse, SignatureRequest, SignatureSubmitResponse, STATUS_PENDING,
};
use crate::services::client_service;
use crate::services::document_service::PdfDocument;
use crate::services::document_store::DocumentStore;
use crate::services::signature_image::SignatureImage;
use crate::services::{packet_service, pdf_service};
use crate::utils::filenames;
use crate::utils::html::escape;

const SIGN_PATH: &str = "/api/v1/justification/client-sign";

pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn sign_path(token: &str) -> String {
    format!("{}/{}", SIGN_PATH, token)
}

/// Accepts a `data:` URL or bare base64.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, AppError> {
    let payload = match data_url.split_once(',') {
        Some((_, data)) => data,
        None => data_url,
    };
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid signature data: {}", e)))
}

pub async fn create_request(
    pool: &PgPool,
    store: &DocumentStore,
    public_base_url: Option<&str>,
    client_id: i64,
) -> Result<SignRequestResponse, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;

    let mut packet_filename = None;
    for name in packet_service::current_packet_candidates(client.id) {
        if store.exists(&client, &name).await {
            packet_filename = Some(name);
            break;
        }
    }
    let packet_filename =
        packet_filename.ok_or(AppError::NotFound("Client packet PDF not found".to_string()))?;

    let token = generate_token();
    db::signature_request_queries::create(pool, client.id, &token, &packet_filename).await?;
    info!(client_id, packet = %packet_filename, "Signature request created");

    let url = sign_path(&token);
    let full_url = public_base_url.map(|base| format!("{}{}", base, url));
    Ok(SignRequestResponse { token, url, full_url })
}

async fn active_request(pool: &PgPool, token: &str) -> Result<(SignatureRequest, Client), AppError> {
    let request = db::signature_request_queries::fetch_by_token(pool, token)
        .await?
        .ok_or(AppError::NotFound("Signing link not found".to_string()))?;
    if request.status != STATUS_PENDING || request.signed_at.is_some() {
        return Err(AppError::Gone("Signing link already used".to_string()));
    }
    let client = db::client_queries::fetch_one(pool, request.client_id)
        .await?
        .ok_or(AppError::NotFound("Signing link not found".to_string()))?;
    Ok((request, client))
}

pub async fn sign_page(pool: &PgPool, token: &str) -> Result<String, AppError> {
    let (_, client) = active_request(pool, token).await?;
    let mut name = client.display_name();
    if name.is_empty() {
        name = if client.id_number.is_empty() {
            "לקוח".to_string()
        } else {
            client.id_number.clone()
        };
    }
    Ok(render_sign_page(&name, &sign_path(token)))
}

pub async fn packet_for_signing(pool: &PgPool, store: &DocumentStore, token: &str) -> Result<PdfDocument, AppError> {
    let (request, client) = active_request(pool, token).await?;
    let bytes = store
        .read(&client, &request.packet_filename)
        .await?
        .ok_or(AppError::NotFound("Client packet PDF not found".to_string()))?;
    Ok(PdfDocument {
        filename: filenames::download_name("packet", &client.id_number, client.id, ""),
        bytes,
    })
}

pub async fn submit_signature(
    pool: &PgPool,
    store: &DocumentStore,
    token: &str,
    signature_data_url: &str,
) -> Result<SignatureSubmitResponse, AppError> {
    if signature_data_url.trim().is_empty() {
        return Err(AppError::Validation("Missing signature data".to_string()));
    }
    let (request, client) = active_request(pool, token).await?;

    let image = decode_data_url(signature_data_url)?;
    let signature = SignatureImage::from_png(&image)?;
    store.write(&client, filenames::CLIENT_SIGNATURE, &image).await?;

    // The base packet is rebuilt so it picks up the latest documents.
    if request.packet_filename == filenames::packet_name(client.id) {
        if let Err(e) = packet_service::build_packet(pool, store, &client).await {
            warn!(client_id = client.id, error = %e, "Packet rebuild before signing failed");
        }
    }

    let packet = store
        .read(&client, &request.packet_filename)
        .await?
        .ok_or(AppError::NotFound("Client packet PDF not found".to_string()))?;

    let signed = pdf_service::stamp_signature(
        &packet,
        &client.display_name(),
        Utc::now(),
        filenames::CLIENT_SIGNATURE,
        &signature,
    )?;
    let signed_name = filenames::packet_signed_name(client.id);
    store.write(&client, &signed_name, &signed).await?;

    let completed = db::signature_request_queries::mark_signed(pool, request.id, &signed_name)
        .await?
        .ok_or(AppError::Gone("Signing link already used".to_string()))?;
    info!(client_id = client.id, request_id = completed.id, "Client packet signed");

    Ok(SignatureSubmitResponse {
        detail: "Signature saved".to_string(),
        status: completed.status,
    })
}

pub fn render_sign_page(client_name: &str, base_path: &str) -> String {
    let name = escape(client_name);
    let packet_url = escape(&format!("{}/packet.pdf", base_path));
    let submit_url = escape(&format!("{}/submit", base_path));
    format!(
        r##"<!DOCTYPE html>
<html lang="he" dir="rtl">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>חתימה על מסמכים</title>
<style>
body {{ font-family: Arial, sans-serif; margin: 0; padding: 16px; background: #f5f5f5; }}
iframe {{ width: 100%; height: 60vh; border: 1px solid #ccc; background: #fff; }}
canvas {{ width: 100%; height: 180px; border: 1px solid #333; background: #fafafa; touch-action: none; }}
button {{ margin-top: 8px; padding: 8px 16px; font-size: 16px; }}
</style>
</head>
<body>
<h2>שלום {name}</h2>
<p>נא לעיין במסמכים ולחתום בתיבה שלמטה.</p>
<iframe src="{packet_url}"></iframe>
<h3>חתימה</h3>
<canvas id="signature-canvas"></canvas>
<div>
<button id="clear-signature" type="button">ניקוי</button>
<button id="submit-signature" type="button">שליחת חתימה</button>
</div>
<p id="status-message"></p>
<script>
(function () {{
  var canvas = document.getElementById("signature-canvas");
  var statusEl = document.getElementById("status-message");
  var ctx = canvas.getContext("2d");
  var drawing = false, hasDrawn = false;
  function resize() {{
    var r = canvas.getBoundingClientRect(), ratio = window.devicePixelRatio || 1;
    canvas.width = r.width * ratio; canvas.height = r.height * ratio;
    ctx.setTransform(ratio, 0, 0, ratio, 0, 0);
    ctx.lineWidth = 2; ctx.lineCap = "round"; ctx.strokeStyle = "#000";
  }}
  function pos(e) {{
    var r = canvas.getBoundingClientRect(), p = e.touches && e.touches.length ? e.touches[0] : e;
    return {{ x: p.clientX - r.left, y: p.clientY - r.top }};
  }}
  function start(e) {{ e.preventDefault(); drawing = true; hasDrawn = true; var p = pos(e); ctx.beginPath(); ctx.moveTo(p.x, p.y); }}
  function move(e) {{ if (!drawing) return; e.preventDefault(); var p = pos(e); ctx.lineTo(p.x, p.y); ctx.stroke(); }}
  function end() {{ drawing = false; }}
  resize();
  window.addEventListener("resize", function () {{ resize(); hasDrawn = false; }});
  canvas.addEventListener("mousedown", start);
  canvas.addEventListener("mousemove", move);
  window.addEventListener("mouseup", end);
  canvas.addEventListener("touchstart", start, {{ passive: false }});
  canvas.addEventListener("touchmove", move, {{ passive: false }});
  window.addEventListener("touchend", end);
  document.getElementById("clear-signature").addEventListener("click", function () {{
    ctx.clearRect(0, 0, canvas.width, canvas.height); hasDrawn = false; statusEl.textContent = "";
  }});
  document.getElementById("submit-signature").addEventListener("click", function () {{
    if (!hasDrawn) {{ statusEl.textContent = "נא לחתום לפני השליחה"; return; }}
    statusEl.textContent = "שולח...";
    fetch("{submit_url}", {{
      method: "POST",
      headers: {{ "Content-Type": "application/json" }},
      body: JSON.stringify({{ signatureDataUrl: canvas.toDataURL("image/png") }})
    }}).then(function (res) {{
      statusEl.textContent = res.ok ? "החתימה נשמרה, תודה" : "שמירת החתימה נכשלה";
    }}).catch(function () {{ statusEl.textContent = "שמירת החתימה נכשלה"; }});
  }});
}})();
</script>
</body>
</html>
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(a, b);
    }

    #[test]
    fn test_decode_data_url_and_bare_base64() {
        let encoded = general_purpose::STANDARD.encode(b"\x89PNG");
        assert_eq!(decode_data_url(&format!("data:image/png;base64,{}", encoded)).unwrap(), b"\x89PNG");
        assert_eq!(decode_data_url(&encoded).unwrap(), b"\x89PNG");
        assert!(matches!(decode_data_url("data:image/png;base64,@@@"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_sign_page_escapes_name_and_links_endpoints() {
        let html = render_sign_page("<דנה>", &sign_path("abc"));
        assert!(html.contains("&lt;דנה&gt;"));
        assert!(html.contains("/api/v1/justification/client-sign/abc/packet.pdf"));
        assert!(html.contains("/api/v1/justification/client-sign/abc/submit"));
        assert!(html.contains(r##"ctx.strokeStyle = "#000";"##));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
