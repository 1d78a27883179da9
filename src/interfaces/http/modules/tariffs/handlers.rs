//! Tariff REST API handlers

use axum::extract::{Query, State};
use rust_decimal::Decimal;
use tracing::info;

use super::dto::{QuarterQuery, ResolveQuery, ResolvedRate, TariffDto, UpsertTariffRequest};
use crate::domain::report::vat_rate;
use crate::domain::{Quarter, TariffTable};
use crate::interfaces::http::common::{
    bad_request, domain_error, ok, ApiError, ApiResponse, ApiResult, ValidatedJson,
};
use crate::interfaces::http::state::AppState;

fn listing(table: &TariffTable) -> Vec<TariffDto> {
    table.entries().into_iter().map(TariffDto::from).collect()
}

fn parse_quarter(raw: &str) -> Result<Quarter, ApiError> {
    raw.parse().map_err(domain_error)
}

#[utoipa::path(
    get,
    path = "/api/tariffs",
    tag = "Tariffs",
    responses(
        (status = 200, description = "Tariff table, most recent quarter first", body = ApiResponse<Vec<TariffDto>>)
    )
)]
pub async fn list_tariffs(State(state): State<AppState>) -> ApiResult<Vec<TariffDto>> {
    ok(listing(&state.automation.tariffs().load().await))
}

#[utoipa::path(
    put,
    path = "/api/tariffs",
    tag = "Tariffs",
    request_body = UpsertTariffRequest,
    responses(
        (status = 200, description = "Updated table", body = ApiResponse<Vec<TariffDto>>),
        (status = 400, description = "Invalid quarter or negative price")
    )
)]
pub async fn upsert_tariff(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpsertTariffRequest>,
) -> ApiResult<Vec<TariffDto>> {
    let quarter = parse_quarter(&req.quarter)?;
    let table = state
        .automation
        .tariffs()
        .upsert(quarter, req.price)
        .await
        .map_err(domain_error)?;
    info!(%quarter, price = %req.price, "💶 Tariff updated");
    ok(listing(&table))
}

#[utoipa::path(
    delete,
    path = "/api/tariffs",
    tag = "Tariffs",
    params(QuarterQuery),
    responses(
        (status = 200, description = "Updated table", body = ApiResponse<Vec<TariffDto>>),
        (status = 404, description = "Quarter has no price")
    )
)]
pub async fn delete_tariff(
    State(state): State<AppState>,
    Query(query): Query<QuarterQuery>,
) -> ApiResult<Vec<TariffDto>> {
    let quarter = parse_quarter(&query.quarter)?;
    let table = state
        .automation
        .tariffs()
        .remove(quarter)
        .await
        .map_err(domain_error)?;
    info!(%quarter, "🗑️ Tariff removed");
    ok(listing(&table))
}

#[utoipa::path(
    get,
    path = "/api/tariffs/resolve",
    tag = "Tariffs",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Rate per kWh", body = ApiResponse<ResolvedRate>),
        (status = 400, description = "Neither a date nor a complete range")
    )
)]
pub async fn resolve_tariff(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<ResolvedRate> {
    let (start, end) = match (query.date, query.start, query.end) {
        (Some(date), None, None) => (date, date),
        (None, Some(start), Some(end)) => (start, end),
        _ => return Err(bad_request("give either date, or both start and end")),
    };
    if end < start {
        return Err(bad_request("end is before start"));
    }
    let rate = state.automation.tariffs().resolve_range(start, end).await;
    ok(ResolvedRate {
        start,
        end,
        rate,
        rate_incl_vat: rate * (Decimal::ONE + vat_rate()),
    })
}
