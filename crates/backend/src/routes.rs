use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, AppState};
use crate::system;

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        // UseCase u508: Sync prices from sheet
        .route(
            "/api/u508/sync/run",
            post(handlers::u508_sync_prices::run_sync),
        )
        .route(
            "/api/u508/sync/preview",
            get(handlers::u508_sync_prices::get_preview),
        )
        .route(
            "/api/u508/sync/last",
            get(handlers::u508_sync_prices::get_last_report),
        )
        .route(
            "/api/u508/sync/runs",
            get(handlers::u508_sync_prices::list_runs),
        )
        .route(
            "/api/u508/sync/runs/:run_id",
            get(handlers::u508_sync_prices::get_run),
        )
        .route(
            "/api/u508/sync/runs/:run_id/log",
            get(handlers::u508_sync_prices::get_run_log),
        )
        .with_state(state)
        .layer(middleware::from_fn(system::middleware::request_logger))
        .layer(cors)
}
