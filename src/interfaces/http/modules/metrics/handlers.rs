use axum::{extract::State, http::header, response::IntoResponse};

use crate::interfaces::http::state::AppState;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /metrics`: request counters plus `automation_runs_total` and
/// `automation_run_duration_seconds`.
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], state.prometheus.render())
}
