use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use floradesk_core::{DemandQuery, DemandReport, Grouping, TimeWindow};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct DemandParams {
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default)]
    pub group: Grouping,
    pub category: Option<String>,
}

fn parse_demand_query(
    params: DemandParams,
    state: &AppState,
    request_id: &str,
) -> Result<DemandQuery, ApiError> {
    let raw_date = params
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::new(request_id, "validation_error", "date is required"))?;
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("date must be YYYY-MM-DD (got '{raw_date}')"),
        )
    })?;
    let window = TimeWindow::parse(params.start.as_deref(), params.end.as_deref())
        .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?;

    Ok(DemandQuery {
        date,
        window,
        offset: state.config.demand_utc_offset,
        grouping: params.group,
        category: params
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    })
}

pub(super) async fn get_demand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<DemandParams>,
) -> Result<Json<ApiResponse<DemandReport>>, ApiError> {
    let query = parse_demand_query(params, &state, &req_id.0)?;

    let report = floradesk_db::load_demand_report(&state.pool, &query)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(report, req_id.0)))
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let categories = floradesk_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(categories, req_id.0)))
}
