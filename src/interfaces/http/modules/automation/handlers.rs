//! Automation REST API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::dto::{
    DeletedResponse, PurgeQuery, RunDto, RunListResponse, ScheduleDto, StatusQuery,
    TriggerAccepted,
};
use crate::application::services::Trigger;
use crate::interfaces::http::common::{
    bad_request, domain_error, not_found, ok, ApiError, ApiResponse, ApiResult, PeriodRequest,
    ValidatedJson,
};
use crate::interfaces::http::state::AppState;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;
const DEFAULT_RETENTION_DAYS: i64 = 90;

#[utoipa::path(
    post,
    path = "/api/automation/trigger",
    tag = "Automation",
    request_body = PeriodRequest,
    responses(
        (status = 202, description = "Run started in the background", body = ApiResponse<TriggerAccepted>),
        (status = 400, description = "Missing or inverted period")
    )
)]
pub async fn trigger_run(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PeriodRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TriggerAccepted>>), ApiError> {
    let period = req.period()?;
    info!(%period, "▶️ Manual automation run requested");
    state.automation.spawn_run(period, Trigger::Manual);
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(TriggerAccepted::for_period(&period))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/automation/status",
    tag = "Automation",
    params(StatusQuery),
    responses(
        (status = 200, description = "Recent runs, newest first", body = ApiResponse<RunListResponse>)
    )
)]
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<RunListResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let runs = state.automation.ledger().runs();
    let total = runs.count().await.map_err(domain_error)?;
    let recent = runs.find_recent(limit).await.map_err(domain_error)?;
    ok(RunListResponse {
        total,
        runs: recent.into_iter().map(RunDto::from).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/api/automation/status/{id}",
    tag = "Automation",
    params(("id" = i32, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Run details", body = ApiResponse<RunDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_run(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<RunDto> {
    match state.automation.ledger().runs().find_by_id(id).await {
        Ok(Some(run)) => ok(run.into()),
        Ok(None) => Err(not_found(format!("Run {} not found", id))),
        Err(e) => Err(domain_error(e)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/automation/runs/{id}",
    tag = "Automation",
    params(("id" = i32, Path, description = "Run ID")),
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<DeletedResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_run(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<DeletedResponse> {
    state
        .automation
        .ledger()
        .runs()
        .delete(id)
        .await
        .map_err(domain_error)?;
    info!(run_id = id, "🗑️ Run deleted");
    ok(DeletedResponse { deleted: 1 })
}

#[utoipa::path(
    post,
    path = "/api/automation/purge",
    tag = "Automation",
    params(PurgeQuery),
    responses(
        (status = 200, description = "Old runs removed", body = ApiResponse<DeletedResponse>),
        (status = 400, description = "Negative retention")
    )
)]
pub async fn purge_runs(
    State(state): State<AppState>,
    Query(query): Query<PurgeQuery>,
) -> ApiResult<DeletedResponse> {
    let days = query.days.unwrap_or(DEFAULT_RETENTION_DAYS);
    if days < 0 {
        return Err(bad_request("days must not be negative"));
    }
    let deleted = state
        .automation
        .ledger()
        .runs()
        .purge_older_than(days)
        .await
        .map_err(domain_error)?;
    info!(days, deleted, "🧹 Run history purged");
    ok(DeletedResponse { deleted })
}

#[utoipa::path(
    get,
    path = "/api/automation/schedule",
    tag = "Automation",
    responses(
        (status = 200, description = "Installed trigger", body = ApiResponse<ScheduleDto>)
    )
)]
pub async fn get_schedule(State(state): State<AppState>) -> ApiResult<ScheduleDto> {
    ok(state.scheduler.status().await.into())
}
