use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use contracts::usecases::common::UseCaseError;
use contracts::usecases::u508_sync_prices_from_sheet::{
    RunHistoryEntry, RunReport, RunTrigger, SheetPreview,
};
use serde::Deserialize;

use crate::api::AppState;
use crate::system::tasks::managers::u508_sync_prices::write_report;
use crate::usecases::u508_sync_prices_from_sheet::SyncError;

const DEFAULT_HISTORY_LIMIT: u64 = 20;
const MAX_HISTORY_LIMIT: u64 = 200;

type ApiError = (StatusCode, Json<UseCaseError>);

fn error_status(err: &SyncError) -> StatusCode {
    match err {
        SyncError::RunInProgress => StatusCode::CONFLICT,
        SyncError::NoSessionFound => StatusCode::SERVICE_UNAVAILABLE,
        SyncError::SourceUnavailable(_)
        | SyncError::SourceEmpty
        | SyncError::Catalog(_) => StatusCode::BAD_GATEWAY,
        SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: SyncError) -> ApiError {
    (error_status(&err), Json(err.into()))
}

/// POST /api/u508/sync/run
///
/// Синхронный запуск: ответ приходит после завершения пакета.
/// Через HTTP запуск всегда ручной, тело запроса не читается.
pub async fn run_sync(State(state): State<AppState>) -> Result<Json<RunReport>, ApiError> {
    match state.runner.run(RunTrigger::Manual).await {
        Ok(report) => {
            if let Err(e) = write_report(&state.task_logger, &report) {
                tracing::error!("Failed to write run log for {}: {}", report.run_id, e);
            }
            Ok(Json(report))
        }
        Err(e) => {
            if !matches!(e, SyncError::RunInProgress) {
                tracing::error!("Manual price sync failed: {}", e);
            }
            Err(api_error(e))
        }
    }
}

/// GET /api/u508/sync/preview
pub async fn get_preview(State(state): State<AppState>) -> Result<Json<SheetPreview>, ApiError> {
    state.runner.preview().await.map(Json).map_err(|e| {
        tracing::error!("Failed to load price sheet preview: {}", e);
        api_error(e)
    })
}

/// GET /api/u508/sync/last
pub async fn get_last_report(State(state): State<AppState>) -> Result<Json<RunReport>, StatusCode> {
    state
        .runner
        .last_report()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<u64>,
}

/// GET /api/u508/sync/runs?limit=N
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<RunHistoryEntry>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    state.runner.recent_runs(limit).await.map(Json).map_err(|e| {
        tracing::error!("Failed to list sync runs: {}", e);
        api_error(e)
    })
}

/// GET /api/u508/sync/runs/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunReport>, ApiError> {
    match state.runner.find_report(&run_id).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(UseCaseError::not_found(format!("Run {} not found", run_id))),
        )),
        Err(e) => {
            tracing::error!("Failed to load run {}: {}", run_id, e);
            Err(api_error(e))
        }
    }
}

/// GET /api/u508/sync/runs/:run_id/log
pub async fn get_run_log(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<String, StatusCode> {
    match state.task_logger.read_log(&run_id) {
        Ok(Some(log)) => Ok(log),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to read run log {}: {}", run_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
