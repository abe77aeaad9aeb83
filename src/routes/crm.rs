use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use http::{header, StatusCode};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{
    Client, ClientDetail, ClientSummaryItem, CreateClient, CreateNote, CreateSnapshot, FundHistoryPoint,
    FundHistoryQuery, HistoryPoint, HistoryQuery, MonthQuery, MonthlyChangePoint, Note, Reminder, Snapshot,
    SummaryResponse, UpdateClient,
};
use crate::routes::html_response;
use crate::services::{client_service, dashboard_service, note_service, report_service, snapshot_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/:id", get(get_client).put(update_client).delete(delete_client))
        .route("/clients/:id/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/clients/:id/latest-snapshots", get(latest_snapshots))
        .route("/clients/:id/report.csv", get(report_csv))
        .route("/clients/:id/report.html", get(report_html))
        .route("/clients/:id/notes", get(list_notes).post(create_note))
        .route("/clients/:id/notes/:note_id", delete(delete_note))
        .route("/clients/:id/notes/:note_id/dismiss", post(dismiss_note))
        .route("/clients/:id/notes/:note_id/clear-reminder", post(clear_reminder))
        .route("/reminders", get(due_reminders))
        .route("/summary", get(summary))
        .route("/monthly-change", get(monthly_change))
        .route("/history", get(history))
        .route("/fund-history", get(fund_history))
        .route("/clients-summary", get(clients_summary))
}

pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, AppError> {
    info!("GET /crm/clients - Fetching all clients");
    let clients = client_service::fetch_all(&state.pool).await.map_err(|e| {
        error!("Failed to fetch clients: {}", e);
        e
    })?;
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ClientDetail>, AppError> {
    info!("GET /crm/clients/{} - Fetching client", id);
    let client = client_service::fetch_detail(&state.pool, id).await.map_err(|e| {
        error!("Failed to fetch client {}: {}", id, e);
        e
    })?;
    Ok(Json(client))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(data): Json<CreateClient>,
) -> Result<(StatusCode, Json<ClientDetail>), AppError> {
    info!("POST /crm/clients - Creating client");
    let client = client_service::create(&state.pool, data).await.map_err(|e| {
        error!("Failed to create client: {}", e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<UpdateClient>,
) -> Result<Json<ClientDetail>, AppError> {
    info!("PUT /crm/clients/{} - Updating client", id);
    let client = client_service::update(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to update client {}: {}", id, e);
        e
    })?;
    Ok(Json(client))
}

pub async fn delete_client(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    info!("DELETE /crm/clients/{} - Deleting client", id);
    client_service::delete(&state.pool, id).await.map_err(|e| {
        error!("Failed to delete client {}: {}", id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_snapshots(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Snapshot>>, AppError> {
    info!("GET /crm/clients/{}/snapshots - Fetching snapshots", id);
    let snapshots = snapshot_service::list(&state.pool, id).await.map_err(|e| {
        error!("Failed to fetch snapshots for client {}: {}", id, e);
        e
    })?;
    Ok(Json(snapshots))
}

pub async fn create_snapshot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<CreateSnapshot>,
) -> Result<(StatusCode, Json<Snapshot>), AppError> {
    info!("POST /crm/clients/{}/snapshots - Creating snapshot", id);
    let snapshot = snapshot_service::create(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to create snapshot for client {}: {}", id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn latest_snapshots(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Snapshot>>, AppError> {
    info!("GET /crm/clients/{}/latest-snapshots - Fetching latest snapshots", id);
    client_service::fetch_one(&state.pool, id).await?;
    let snapshots = dashboard_service::get_latest_snapshots(&state.pool, id).await.map_err(|e| {
        error!("Failed to fetch latest snapshots for client {}: {}", id, e);
        e
    })?;
    Ok(Json(snapshots))
}

pub async fn report_csv(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    info!("GET /crm/clients/{}/report.csv - Exporting balance report", id);
    let csv = report_service::client_report_csv(&state.pool, id).await.map_err(|e| {
        error!("Failed to export report for client {}: {}", id, e);
        e
    })?;
    let disposition = format!("attachment; filename=\"client_{}_report.csv\"", id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

pub async fn report_html(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, AppError> {
    info!("GET /crm/clients/{}/report.html - Rendering balance report", id);
    let html = report_service::client_report_html(&state.pool, id, query.month.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to render report for client {}: {}", id, e);
            e
        })?;
    Ok(html_response(html))
}

pub async fn list_notes(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Vec<Note>>, AppError> {
    info!("GET /crm/clients/{}/notes - Fetching notes", id);
    let notes = note_service::list(&state.pool, id).await.map_err(|e| {
        error!("Failed to fetch notes for client {}: {}", id, e);
        e
    })?;
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<CreateNote>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    info!("POST /crm/clients/{}/notes - Creating note", id);
    let note = note_service::create(&state.pool, id, data).await.map_err(|e| {
        error!("Failed to create note for client {}: {}", id, e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn dismiss_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(i64, i64)>,
) -> Result<Json<Note>, AppError> {
    info!("POST /crm/clients/{}/notes/{}/dismiss - Dismissing reminder", id, note_id);
    let note = note_service::dismiss(&state.pool, id, note_id).await.map_err(|e| {
        error!("Failed to dismiss note {}: {}", note_id, e);
        e
    })?;
    Ok(Json(note))
}

pub async fn clear_reminder(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(i64, i64)>,
) -> Result<Json<Note>, AppError> {
    info!("POST /crm/clients/{}/notes/{}/clear-reminder - Clearing reminder", id, note_id);
    let note = note_service::clear_reminder(&state.pool, id, note_id).await.map_err(|e| {
        error!("Failed to clear reminder on note {}: {}", note_id, e);
        e
    })?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /crm/clients/{}/notes/{} - Deleting note", id, note_id);
    note_service::delete(&state.pool, id, note_id).await.map_err(|e| {
        error!("Failed to delete note {}: {}", note_id, e);
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn due_reminders(State(state): State<AppState>) -> Result<Json<Vec<Reminder>>, AppError> {
    info!("GET /crm/reminders - Fetching due reminders");
    let reminders = note_service::due_reminders(&state.pool).await.map_err(|e| {
        error!("Failed to fetch reminders: {}", e);
        e
    })?;
    Ok(Json(reminders))
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    info!("GET /crm/summary - Computing summary for {:?}", query.month);
    let summary = dashboard_service::get_summary(&state.pool, query.month.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to compute summary: {}", e);
            e
        })?;
    Ok(Json(summary))
}

pub async fn monthly_change(State(state): State<AppState>) -> Result<Json<Vec<MonthlyChangePoint>>, AppError> {
    info!("GET /crm/monthly-change - Computing monthly change");
    let points = dashboard_service::get_monthly_change(&state.pool).await.map_err(|e| {
        error!("Failed to compute monthly change: {}", e);
        e
    })?;
    Ok(Json(points))
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>, AppError> {
    info!("GET /crm/history - Fetching history for {:?}", query.client_id);
    let points = dashboard_service::get_history(&state.pool, query.client_id).await.map_err(|e| {
        error!("Failed to fetch history: {}", e);
        e
    })?;
    Ok(Json(points))
}

pub async fn fund_history(
    State(state): State<AppState>,
    Query(query): Query<FundHistoryQuery>,
) -> Result<Json<Vec<FundHistoryPoint>>, AppError> {
    info!(
        "GET /crm/fund-history - Fetching fund {} for client {}",
        query.fund_number, query.client_id
    );
    let points = dashboard_service::get_fund_history(&state.pool, query.client_id, &query.fund_number)
        .await
        .map_err(|e| {
            error!("Failed to fetch fund history: {}", e);
            e
        })?;
    Ok(Json(points))
}

pub async fn clients_summary(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<ClientSummaryItem>>, AppError> {
    info!("GET /crm/clients-summary - Summarizing clients for {:?}", query.month);
    let items = dashboard_service::get_client_summaries(&state.pool, query.month.as_deref())
        .await
        .map_err(|e| {
            error!("Failed to summarize clients: {}", e);
            e
        })?;
    Ok(Json(items))
}
