//! Per-request Prometheus counters.
//!
//! Paths are labelled with the matched route template, so `/api/automation/status/17`
//! is counted under `/api/automation/status/{id}`. Requests that match no
//! route share the `unmatched` label.

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};

pub async fn http_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_owned(), |p| p.as_str().to_owned());

    let started = Instant::now();
    let response = next.run(request).await;

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => route.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method, "path" => route)
        .record(started.elapsed().as_secs_f64());

    response
}
