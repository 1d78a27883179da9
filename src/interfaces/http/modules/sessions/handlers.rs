//! Session REST API handlers
//!
//! Uploaded and fetched sessions both land in the ledger's cache blob,
//! a JSON array of canonical sessions. The summary and manual report
//! endpoints read from that blob only.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use tracing::{info, warn};

use super::dto::{DatasetSummary, SummaryQuery, SummaryResponse, UploadRequest};
use crate::application::services::cost::{
    distinct_vehicles, duration_distribution, filter_sessions, monthly_breakdown, price_sessions,
    statistics, weekday_consumption, weekly_breakdown,
};
use crate::domain::{ChargingSession, Period};
use crate::infrastructure::intake::parse_upload;
use crate::interfaces::http::common::{
    automation_error, bad_request, domain_error, error, internal, not_found, ok, provider_error,
    ApiError,
    ApiResponse, ApiResult, PeriodRequest, ValidatedJson,
};
use crate::interfaces::http::state::AppState;

/// Sessions in the cache blob. 404 when nothing was uploaded or fetched yet.
pub(crate) async fn cached_sessions(state: &AppState) -> Result<Vec<ChargingSession>, ApiError> {
    let blob = state
        .automation
        .ledger()
        .config()
        .get_cache()
        .await
        .map_err(domain_error)?
        .ok_or_else(|| not_found("No session data yet, upload or fetch sessions first"))?;

    serde_json::from_str(&blob).map_err(|e| {
        warn!(error = %e, "Cached session data is unreadable");
        internal(format!("Cached session data is unreadable: {}", e))
    })
}

async fn replace_cache(state: &AppState, sessions: &[ChargingSession]) -> Result<(), ApiError> {
    let blob = serde_json::to_string(sessions).map_err(|e| internal(e.to_string()))?;
    state
        .automation
        .ledger()
        .config()
        .save_cache(&blob)
        .await
        .map_err(domain_error)
}

#[utoipa::path(
    post,
    path = "/api/sessions/upload",
    tag = "Sessions",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Export parsed and cached", body = ApiResponse<DatasetSummary>),
        (status = 400, description = "Not a data URI, bad encoding or missing column")
    )
)]
pub async fn upload_sessions(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UploadRequest>,
) -> ApiResult<DatasetSummary> {
    let sessions = parse_upload(&req.contents).map_err(|e| bad_request(e.to_string()))?;
    replace_cache(&state, &sessions).await?;
    info!(
        filename = req.filename.as_deref().unwrap_or("-"),
        sessions = sessions.len(),
        "📤 Session export uploaded"
    );
    ok(DatasetSummary::of(&sessions))
}

#[utoipa::path(
    post,
    path = "/api/sessions/fetch",
    tag = "Sessions",
    request_body = PeriodRequest,
    responses(
        (status = 200, description = "Sessions fetched and cached", body = ApiResponse<DatasetSummary>),
        (status = 400, description = "Missing period, provider settings or rejected credentials"),
        (status = 502, description = "Provider unreachable or listing failed")
    )
)]
pub async fn fetch_sessions(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PeriodRequest>,
) -> ApiResult<DatasetSummary> {
    let period = req.period()?;
    let settings = state
        .automation
        .resolved_settings()
        .await
        .map_err(automation_error)?;
    let credentials = settings.provider_credentials();
    if credentials.client_id.is_empty()
        || credentials.client_secret.is_empty()
        || credentials.location_id.is_empty()
    {
        return Err(bad_request("Incomplete provider credentials"));
    }

    let source = state.automation.sources().create(&credentials);
    source
        .authenticate()
        .await
        .map_err(provider_error)?;

    let sessions = source
        .fetch_sessions(&credentials.location_id, &period)
        .await
        .ok_or_else(|| error(StatusCode::BAD_GATEWAY, "Could not fetch sessions from provider"))?;

    replace_cache(&state, &sessions).await?;
    info!(%period, sessions = sessions.len(), "📥 Sessions fetched from provider");
    ok(DatasetSummary::of(&sessions))
}

#[utoipa::path(
    get,
    path = "/api/sessions/summary",
    tag = "Sessions",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Figures for the period", body = ApiResponse<SummaryResponse>),
        (status = 400, description = "Inverted period"),
        (status = 404, description = "No cached sessions")
    )
)]
pub async fn session_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<SummaryResponse> {
    let period = Period::new(query.period_start, query.period_end).map_err(domain_error)?;
    let sessions = cached_sessions(&state).await?;

    let available_vehicles = distinct_vehicles(&sessions);
    let vehicles = query
        .vehicle_filter()
        .unwrap_or_else(|| available_vehicles.clone());

    let selected = filter_sessions(&sessions, &period, &vehicles);
    let durations = duration_distribution(&selected);
    let tariffs = state.automation.tariffs().load().await;
    let costed = price_sessions(selected, &tariffs);

    ok(SummaryResponse {
        period_start: period.start,
        period_end: period.end,
        vehicles,
        available_vehicles,
        statistics: statistics(&costed),
        monthly: monthly_breakdown(&costed),
        weekly: weekly_breakdown(&costed),
        weekdays: weekday_consumption(&costed),
        durations,
    })
}
