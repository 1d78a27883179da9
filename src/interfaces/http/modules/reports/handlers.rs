//! Report REST API handlers

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Local;
use tracing::info;

use super::dto::MonthlyReportRequest;
use crate::application::services::cost::{
    distinct_vehicles, filter_sessions, price_sessions_for_report,
};
use crate::domain::MonthlyReport;
use crate::interfaces::http::common::{internal, ApiError, ValidatedJson};
use crate::interfaces::http::modules::sessions::cached_sessions;
use crate::interfaces::http::state::AppState;

pub fn report_filename(report: &MonthlyReport) -> String {
    format!(
        "expense_report_{}_{}.pdf",
        report.period.start, report.period.end
    )
}

#[utoipa::path(
    post,
    path = "/api/reports/monthly",
    tag = "Reports",
    request_body = MonthlyReportRequest,
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Missing or inverted period"),
        (status = 404, description = "No cached sessions")
    )
)]
pub async fn monthly_report(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MonthlyReportRequest>,
) -> Result<Response, ApiError> {
    let period = req.period_request().period()?;
    let sessions = cached_sessions(&state).await?;

    let vehicles = req
        .vehicles
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| distinct_vehicles(&sessions));
    let tariffs = state.automation.tariffs().load().await;
    let costed = price_sessions_for_report(filter_sessions(&sessions, &period, &vehicles), &tariffs);
    let report = MonthlyReport::build(
        &costed,
        period,
        &vehicles,
        &tariffs,
        Local::now().date_naive(),
    );

    let bytes = state
        .automation
        .renderer()
        .render(&report)
        .map_err(|e| internal(e.to_string()))?;
    info!(%period, bytes = bytes.len(), "📄 Report rendered for download");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report_filename(&report)),
            ),
        ],
        bytes,
    )
        .into_response())
}
