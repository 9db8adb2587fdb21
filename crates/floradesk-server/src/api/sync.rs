use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use floradesk_sync::{run_recorded_sync, SyncSummary, TriggerSource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

/// Body of `POST /api/v1/sync`. `summary` is present only on success.
#[derive(Debug, Serialize)]
pub(super) struct SyncResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SyncSummary>,
}

impl SyncResponse {
    fn failed(message: &str, error: String) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            error: Some(error),
            summary: None,
        }
    }
}

pub(super) async fn trigger_sync(
    State(state): State<AppState>,
) -> (StatusCode, Json<SyncResponse>) {
    let Some(_permit) = state.sync_guard.try_acquire() else {
        tracing::info!("sync requested while another pass is running");
        return (
            StatusCode::CONFLICT,
            Json(SyncResponse::failed(
                "Sync already running",
                "a sync pass is already in progress".to_string(),
            )),
        );
    };

    match run_recorded_sync(&state.pool, &state.config, TriggerSource::Api).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                message: summary.message(),
                error: None,
                summary: Some(summary),
            }),
        ),
        Err(e) if e.is_configuration() => {
            tracing::warn!(error = %e, "sync rejected: Shopify not configured");
            (
                StatusCode::BAD_REQUEST,
                Json(SyncResponse::failed("Sync not configured", e.to_string())),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "sync failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncResponse::failed("Sync failed", e.to_string())),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    sync_run_id: Uuid,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    varieties_synced: i32,
    orders_synced: i32,
    items_inserted: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = floradesk_db::list_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SyncRunItem {
            sync_run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            varieties_synced: row.varieties_synced,
            orders_synced: row.orders_synced,
            items_inserted: row.items_inserted,
            error_message: row.error_message,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
