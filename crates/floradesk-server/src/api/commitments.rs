use axum::{extract::State, Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CaptureRequest {
    pub variety_id: i64,
    pub delivery_date: NaiveDate,
    pub captured_qty: i32,
    pub captured_by: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CommitmentItem {
    id: i64,
    variety_id: i64,
    delivery_date: NaiveDate,
    demand_qty: i32,
    captured_qty: i32,
    captured_by: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Manual capture. Last write wins; no version check.
pub(super) async fn capture(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CaptureRequest>,
) -> Result<Json<ApiResponse<CommitmentItem>>, ApiError> {
    let row = floradesk_db::capture_commitment(
        &state.pool,
        body.variety_id,
        body.delivery_date,
        body.captured_qty,
        &body.captured_by,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(
        variety_id = row.variety_id,
        delivery_date = %row.delivery_date,
        captured_qty = row.captured_qty,
        "commitment captured"
    );

    Ok(Json(ApiResponse::new(
        CommitmentItem {
            id: row.id,
            variety_id: row.variety_id,
            delivery_date: row.delivery_date,
            demand_qty: row.demand_qty,
            captured_qty: row.captured_qty,
            captured_by: row.captured_by,
            updated_at: row.updated_at,
        },
        req_id.0,
    )))
}
