use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use floradesk_core::{AppConfig, Environment, NewOrder, NewVariety, OrderStatus};
use floradesk_sync::SyncGuard;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;

use super::*;
use crate::middleware::{AuthState, RateLimitState};

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://floradesk@127.0.0.1:1/floradesk".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 1,
        db_min_connections: 0,
        db_acquire_timeout_secs: 1,
        shopify_shop_domain: None,
        shopify_access_token: None,
        shopify_api_version: "2024-01".to_string(),
        shopify_timeout_secs: 5,
        shopify_user_agent: "floradesk-test".to_string(),
        shopify_page_size: 250,
        shopify_inter_request_delay_ms: 0,
        sync_lookback_days: 60,
        sync_catalog_cap: 100,
        sync_open_orders_cap: 100,
        sync_recent_orders_cap: 100,
        sync_chunk_size: 100,
        sync_cron: None,
        demand_utc_offset: FixedOffset::west_opt(6 * 3600).expect("offset"),
        api_keys: Vec::new(),
    }
}

/// A pool that never connects; requests that reach the store fail fast.
fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy(&test_config().database_url)
        .expect("lazy pool")
}

fn state_with(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        sync_guard: SyncGuard::new(),
    }
}

fn open_app(state: AppState) -> Router {
    build_app(state, AuthState::disabled(), default_rate_limit_state())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn put_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

// -------------------------------------------------------------------------
// Envelope helpers
// -------------------------------------------------------------------------

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 20);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 100);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn db_errors_map_to_matching_codes() {
    let not_found = map_db_error("r".to_string(), &floradesk_db::DbError::NotFound);
    assert_eq!(not_found.error.code, "not_found");

    let invalid = map_db_error(
        "r".to_string(),
        &floradesk_db::DbError::Validation("captured_by must not be empty".to_string()),
    );
    assert_eq!(invalid.error.code, "validation_error");
    assert_eq!(invalid.error.message, "captured_by must not be empty");

    let other = map_db_error("r".to_string(), &floradesk_db::DbError::MissingDatabaseUrl);
    assert_eq!(other.error.code, "internal_error");
    assert_eq!(other.error.message, "database query failed");
}

// -------------------------------------------------------------------------
// Routes without a database
// -------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_degraded_when_database_unreachable() {
    let response = open_app(state_with(unreachable_pool()))
        .oneshot(get("/api/v1/health"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "degraded");
}

#[tokio::test]
async fn request_id_header_is_echoed() {
    let response = open_app(state_with(unreachable_pool()))
        .oneshot(
            Request::builder()
                .uri("/api/v1/demand")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.headers()["x-request-id"], "req-abc");
    let json = body_json(response).await;
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let auth = AuthState::from_keys(vec!["k-123".to_string()], false).expect("auth");
    let app = build_app(state_with(unreachable_pool()), auth, default_rate_limit_state());

    let response = app
        .clone()
        .oneshot(get("/api/v1/demand?date=2026-02-09&start=13:00&end=12:00"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let authorized = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/demand?date=2026-02-09&start=13:00&end=12:00")
                .header("authorization", "Bearer k-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(authorized.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_is_public_when_auth_enabled() {
    let auth = AuthState::from_keys(vec!["k-123".to_string()], false).expect("auth");
    let response = build_app(state_with(unreachable_pool()), auth, default_rate_limit_state())
        .oneshot(get("/api/v1/health"))
        .await
        .expect("response");

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rate_limit_rejects_requests_past_the_window_budget() {
    let app = build_app(
        state_with(unreachable_pool()),
        AuthState::disabled(),
        RateLimitState::new(1, Duration::from_secs(60)),
    );

    let first = app.clone().oneshot(get("/api/v1/demand")).await.expect("response");
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = app.oneshot(get("/api/v1/demand")).await.expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn demand_requires_valid_date() {
    let app = open_app(state_with(unreachable_pool()));

    let missing = app.clone().oneshot(get("/api/v1/demand")).await.expect("response");
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["error"]["code"], "validation_error");

    let malformed = app
        .oneshot(get("/api/v1/demand?date=09/02/2026"))
        .await
        .expect("response");
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn demand_rejects_bad_time_window() {
    let app = open_app(state_with(unreachable_pool()));

    let inverted = app
        .clone()
        .oneshot(get("/api/v1/demand?date=2026-02-09&start=13:00&end=12:00"))
        .await
        .expect("response");
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);

    let garbage = app
        .oneshot(get("/api/v1/demand?date=2026-02-09&start=noon"))
        .await
        .expect("response");
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn capture_rejects_negative_quantity_before_store() {
    let response = open_app(state_with(unreachable_pool()))
        .oneshot(put_json(
            "/api/v1/commitments",
            &serde_json::json!({
                "variety_id": 1,
                "delivery_date": "2026-02-09",
                "captured_qty": -5,
                "captured_by": "María"
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn sync_returns_conflict_while_pass_running() {
    let state = state_with(unreachable_pool());
    let _permit = state.sync_guard.try_acquire().expect("permit");

    let response = open_app(state)
        .oneshot(post("/api/v1/sync"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Sync already running");
}

#[tokio::test]
async fn sync_without_shop_credentials_is_bad_request() {
    let response = open_app(state_with(unreachable_pool()))
        .oneshot(post("/api/v1/sync"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .expect("error string")
        .contains("SHOPIFY_SHOP_URL"));
    assert!(json.get("summary").is_none());
}

#[tokio::test]
async fn sync_without_shop_credentials_skips_the_store() {
    let slow_pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(3))
        .connect_lazy(&test_config().database_url)
        .expect("lazy pool");

    let started = std::time::Instant::now();
    let response = open_app(state_with(slow_pool))
        .oneshot(post("/api/v1/sync"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(started.elapsed() < Duration::from_secs(1));
}

// -------------------------------------------------------------------------
// Routes with a database
// -------------------------------------------------------------------------

async fn seed_demand(pool: &PgPool) -> i64 {
    floradesk_db::upsert_varieties(
        pool,
        &[NewVariety {
            name: "Rosa - Roja".to_string(),
            sku: "ROSA-ROJA".to_string(),
            image_url: None,
            category: "Rosas".to_string(),
        }],
    )
    .await
    .expect("seed variety");
    let variety_id = floradesk_db::variety_sku_index(pool).await.expect("index")["ROSA-ROJA"];

    let saved = floradesk_db::upsert_orders(
        pool,
        &[NewOrder {
            shopify_id: 9001,
            order_number: "#9001".to_string(),
            client_name: "Ana Ruiz".to_string(),
            location: "Puebla".to_string(),
            status: OrderStatus::Pending,
            is_vip: false,
            // 12:30 local at UTC-6.
            created_at: Utc.with_ymd_and_hms(2026, 2, 5, 18, 30, 0).unwrap(),
            delivery_date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
        }],
    )
    .await
    .expect("seed order");

    floradesk_db::insert_order_items(
        pool,
        &[floradesk_db::NewOrderItem {
            order_id: saved[0].id,
            variety_id,
            quantity: 100,
            unit: "unidades".to_string(),
        }],
    )
    .await
    .expect("seed items");

    variety_id
}

#[sqlx::test(migrations = "../../migrations")]
async fn demand_report_reflects_captures(pool: PgPool) {
    let variety_id = seed_demand(&pool).await;
    let app = open_app(state_with(pool));

    let captured = app
        .clone()
        .oneshot(put_json(
            "/api/v1/commitments",
            &serde_json::json!({
                "variety_id": variety_id,
                "delivery_date": "2026-02-09",
                "captured_qty": 80,
                "captured_by": "María"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(captured.status(), StatusCode::OK);
    assert_eq!(body_json(captured).await["data"]["demand_qty"], 0);

    let response = app
        .oneshot(get("/api/v1/demand?date=2026-02-09&start=12:00&end=13:00"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let row = &json["data"]["rows"][0];
    assert_eq!(row["demand"], 100);
    assert_eq!(row["captured"], 80);
    assert_eq!(row["variance"], -20);
    assert_eq!(row["fulfillment_pct"], 80);
    assert_eq!(row["captured_by"], "María");
    assert_eq!(json["data"]["distinct_clients"], 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn demand_window_excludes_orders_outside_it(pool: PgPool) {
    seed_demand(&pool).await;

    let response = open_app(state_with(pool))
        .oneshot(get("/api/v1/demand?date=2026-02-09&start=12:31&end=13:00"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["rows"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["data"]["total_demand"], 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn categories_lists_seeded_category(pool: PgPool) {
    seed_demand(&pool).await;

    let response = open_app(state_with(pool))
        .oneshot(get("/api/v1/categories"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], serde_json::json!(["Rosas"]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_runs_lists_recorded_runs(pool: PgPool) {
    let run = floradesk_db::create_sync_run(&pool, "cli").await.expect("run");
    floradesk_db::start_sync_run(&pool, run.id).await.expect("start");
    floradesk_db::fail_sync_run(&pool, run.id, "boom").await.expect("fail");

    let response = open_app(state_with(pool))
        .oneshot(get("/api/v1/sync/runs?limit=5"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let runs = json["data"].as_array().expect("data array");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["status"], "failed");
    assert_eq!(runs[0]["error_message"], "boom");
    assert_eq!(runs[0]["trigger_source"], "cli");
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_without_shop_credentials_records_no_run(pool: PgPool) {
    let response = open_app(state_with(pool.clone()))
        .oneshot(post("/api/v1/sync"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let runs = floradesk_db::list_sync_runs(&pool, 10).await.expect("runs");
    assert!(runs.is_empty());
}
