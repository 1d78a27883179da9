//! API router with Swagger UI

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::common::{ApiResponse, PeriodRequest};
use super::modules::{automation, config, health, metrics, reports, sessions, tariffs};
use super::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Automation
        automation::trigger_run,
        automation::list_runs,
        automation::get_run,
        automation::delete_run,
        automation::purge_runs,
        automation::get_schedule,
        // Config
        config::get_config,
        config::update_config,
        config::test_provider,
        config::test_email,
        // Tariffs
        tariffs::list_tariffs,
        tariffs::upsert_tariff,
        tariffs::delete_tariff,
        tariffs::resolve_tariff,
        // Sessions
        sessions::upload_sessions,
        sessions::fetch_sessions,
        sessions::session_summary,
        // Reports
        reports::monthly_report,
    ),
    components(
        schemas(
            ApiResponse<String>,
            PeriodRequest,
            health::HealthResponse,
            automation::dto::TriggerAccepted,
            automation::dto::RunDto,
            automation::dto::RunListResponse,
            automation::dto::DeletedResponse,
            automation::dto::ScheduleDto,
            config::dto::ConfigResponse,
            config::dto::UpdateConfigRequest,
            config::dto::TestProviderRequest,
            config::dto::TestEmailRequest,
            config::dto::TestResult,
            tariffs::dto::TariffDto,
            tariffs::dto::UpsertTariffRequest,
            tariffs::dto::ResolvedRate,
            sessions::dto::UploadRequest,
            sessions::dto::DatasetSummary,
            sessions::dto::SummaryResponse,
            reports::dto::MonthlyReportRequest,
        )
    ),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Automation", description = "Monthly report runs: manual trigger, run history, schedule"),
        (name = "Config", description = "Stored settings and connection tests"),
        (name = "Tariffs", description = "Quarterly regulated electricity tariffs"),
        (name = "Sessions", description = "Session upload, provider fetch and dashboard figures"),
        (name = "Reports", description = "On-demand expense report download"),
    ),
    info(
        title = "Recharge Automation API",
        version = "1.0.0",
        description = "Monthly EV home-charging expense reports"
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let automation_routes = Router::new()
        .route("/trigger", post(automation::trigger_run))
        .route("/status", get(automation::list_runs))
        .route("/status/{id}", get(automation::get_run))
        .route("/runs/{id}", delete(automation::delete_run))
        .route("/purge", post(automation::purge_runs))
        .route("/schedule", get(automation::get_schedule));

    let config_routes = Router::new()
        .route("/test-provider", post(config::test_provider))
        .route("/test-email", post(config::test_email));

    let tariff_routes = Router::new().route("/resolve", get(tariffs::resolve_tariff));

    let session_routes = Router::new()
        .route("/upload", post(sessions::upload_sessions))
        .route("/fetch", post(sessions::fetch_sessions))
        .route("/summary", get(sessions::session_summary));

    let report_routes = Router::new().route("/monthly", post(reports::monthly_report));

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .nest("/api/automation", automation_routes)
        .route(
            "/api/config",
            get(config::get_config).put(config::update_config),
        )
        .nest("/api/config", config_routes)
        .route(
            "/api/tariffs",
            get(tariffs::list_tariffs)
                .put(tariffs::upsert_tariff)
                .delete(tariffs::delete_tariff),
        )
        .nest("/api/tariffs", tariff_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/reports", report_routes)
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use tower::Service;

    use crate::application::settings::SMTP_PASSWORD;
    use crate::application::testing::*;
    use crate::application::{AutomationService, ScheduleController, TariffStore};
    use crate::domain::{Period, RunLedger, TariffTable};
    use crate::infrastructure::storage::InMemoryLedger;
    use crate::shared::ShutdownSignal;

    struct TestApp {
        router: Router,
        ledger: Arc<InMemoryLedger>,
        notifier: Arc<RecordingNotifier>,
    }

    fn app_with(source: Arc<StubSource>) -> TestApp {
        let ledger = Arc::new(InMemoryLedger::new());
        let notifier = RecordingNotifier::accepting();
        let automation = Arc::new(AutomationService::new(
            ledger.clone(),
            Arc::new(TariffStore::new(Arc::new(MemoryTariffRepository::with(
                TariffTable::defaults(),
            )))),
            Arc::new(StubSourceFactory(source)),
            StubRenderer::writing(),
            Arc::new(RecordingNotifierFactory(notifier.clone())),
            complete_defaults(),
        ));
        let scheduler = Arc::new(ScheduleController::new(
            automation.clone(),
            ShutdownSignal::new(),
        ));
        let prometheus = PrometheusBuilder::new().build_recorder().handle();

        TestApp {
            router: create_api_router(AppState::new(automation, scheduler, prometheus)),
            ledger,
            notifier,
        }
    }

    fn app() -> TestApp {
        app_with(StubSource::returning(vec![
            session("Borne A", "2025-05-03 19:00", dec!(10)),
            session("Borne B", "2025-05-10 19:00", dec!(5)),
        ]))
    }

    async fn send(
        app: &TestApp,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut svc = app.router.clone().into_service();
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = svc.call(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes.to_vec())
    }

    async fn send_json(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, bytes) = send(app, method, uri, body).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn data_uri(text: &str) -> String {
        format!("data:text/csv;base64,{}", STANDARD.encode(text))
    }

    const EXPORT: &str = "Nom de la borne de recharge;De;À;Durée [h:mm];kWh\n\
        Borne A;2025-05-03 19:00;2025-05-03 21:00;2:00;10,0\n\
        Borne B;2025-05-10 19:00;2025-05-10 20:00;1:00;5,0\n\
        Borne A;2025-06-01 08:00;2025-06-01 09:00;1:00;4,0\n";

    #[tokio::test]
    async fn health_reports_healthy() {
        let (status, body) = send_json(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "recharge-automation-api");
    }

    #[tokio::test]
    async fn trigger_requires_both_bounds() {
        let (status, body) = send_json(
            &app(),
            "POST",
            "/api/automation/trigger",
            Some(json!({"period_start": "2025-05-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("period_end"));
    }

    #[tokio::test]
    async fn trigger_is_accepted_and_echoes_period() {
        let (status, body) = send_json(
            &app(),
            "POST",
            "/api/automation/trigger",
            Some(json!({"period_start": "2025-05-01", "period_end": "2025-05-31"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["period_start"], "2025-05-01");
        assert_eq!(body["data"]["period_end"], "2025-05-31");
    }

    #[tokio::test]
    async fn inverted_trigger_period_is_rejected() {
        let (status, _) = send_json(
            &app(),
            "POST",
            "/api/automation/trigger",
            Some(json!({"period_start": "2025-05-31", "period_end": "2025-05-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_status_lists_and_looks_up_runs() {
        let app = app();
        let may = Period::month_of(chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let run = app.ledger.runs().create(&may).await.unwrap();

        let (status, body) = send_json(&app, "GET", "/api/automation/status?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["runs"][0]["step"], "initialized");

        let uri = format!("/api/automation/status/{}", run.id);
        let (status, body) = send_json(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");

        let (status, _) = send_json(&app, "GET", "/api/automation/status/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/automation/runs/{}", run.id);
        let (status, _) = send_json(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_json(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_masks_secrets_and_rejects_unknown_keys() {
        let app = app();
        app.ledger.config().save(SMTP_PASSWORD, "hunter2").await.unwrap();

        let (status, body) = send_json(&app, "GET", "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["values"]["smtp_password"], "********");
        assert_eq!(body["data"]["values"]["smtp_user"], "bot@example.com");

        let (status, _) = send_json(
            &app,
            "PUT",
            "/api/config",
            Some(json!({"values": {"latest_api_cache": "[]"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn saving_config_keeps_masked_secret_and_reinstalls_schedule() {
        let app = app();
        app.ledger.config().save(SMTP_PASSWORD, "hunter2").await.unwrap();

        let (status, body) = send_json(
            &app,
            "PUT",
            "/api/config",
            Some(json!({"values": {
                "smtp_password": "********",
                "schedule_mode": "disabled",
                "notification_email": "me@example.com"
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["schedule"]["mode"], "disabled");
        assert_eq!(body["data"]["schedule"]["armed"], false);
        assert_eq!(body["data"]["values"]["notification_email"], "me@example.com");
        assert_eq!(
            app.ledger.config().get(SMTP_PASSWORD).await.unwrap().as_deref(),
            Some("hunter2")
        );
    }

    #[tokio::test]
    async fn provider_test_reports_rejected_credentials() {
        let app = app_with(StubSource::rejecting_credentials());
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/config/test-provider",
            Some(json!({"client_id": "id", "client_secret": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("401"));

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/config/test-provider",
            Some(json!({"client_id": "", "client_secret": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_gateway_error_on_both_paths() {
        let app = app_with(StubSource::unreachable());
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/config/test-provider",
            Some(json!({"client_id": "id", "client_secret": "secret"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/sessions/fetch",
            Some(json!({"period_start": "2025-05-01", "period_end": "2025-05-31"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn fetch_with_rejected_credentials_is_a_bad_request() {
        let (status, body) = send_json(
            &app_with(StubSource::rejecting_credentials()),
            "POST",
            "/api/sessions/fetch",
            Some(json!({"period_start": "2025-05-01", "period_end": "2025-05-31"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn malformed_config_body_is_a_bad_request() {
        let (status, body) =
            send_json(&app(), "PUT", "/api/config", Some(json!("schedule_mode=disabled"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn purge_rejects_out_of_range_retention() {
        let app = app();
        let may = Period::month_of(chrono::NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        app.ledger.runs().create(&may).await.unwrap();

        let (status, body) =
            send_json(&app, "POST", "/api/automation/purge?days=200000000", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("out of range"));

        let (status, _) = send_json(&app, "POST", "/api/automation/purge?days=-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(&app, "POST", "/api/automation/purge?days=30", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 0);
        assert_eq!(app.ledger.runs().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn email_test_sends_to_target() {
        let app = app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/config/test-email",
            Some(json!({
                "smtp_server": "smtp.example.com",
                "smtp_port": 587,
                "smtp_user": "bot@example.com",
                "smtp_password": "pw",
                "test_email": "owner@example.com"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["message"], "Email sent successfully");
        assert_eq!(
            app.notifier.sent(),
            vec![Sent::Test {
                to: "owner@example.com".into()
            }]
        );
    }

    #[tokio::test]
    async fn tariff_upsert_resolve_and_delete() {
        let app = app();
        let (status, body) = send_json(
            &app,
            "PUT",
            "/api/tariffs",
            Some(json!({"quarter": "Q3/2026", "price": 40.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["quarter"], "Q3/2026");

        let (status, body) =
            send_json(&app, "GET", "/api/tariffs/resolve?date=2026-08-15", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rate"], 0.4);

        let (status, _) = send_json(&app, "GET", "/api/tariffs/resolve", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(&app, "DELETE", "/api/tariffs?quarter=Q3/2026", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_json(&app, "DELETE", "/api/tariffs?quarter=Q3/2026", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(
            &app,
            "PUT",
            "/api/tariffs",
            Some(json!({"quarter": "Q5/2026", "price": 1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summary_needs_cached_sessions() {
        let (status, _) = send_json(
            &app(),
            "GET",
            "/api/sessions/summary?period_start=2025-05-01&period_end=2025-05-31",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploaded_export_feeds_summary() {
        let app = app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/sessions/upload",
            Some(json!({"filename": "export.csv", "contents": data_uri(EXPORT)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sessions"], 3);
        assert_eq!(body["data"]["vehicles"], json!(["Borne A", "Borne B"]));

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/sessions/summary?period_start=2025-05-01&period_end=2025-05-31&vehicles=Borne%20A",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["vehicles"], json!(["Borne A"]));
        assert_eq!(body["data"]["statistics"]["total_sessions"], 1);
    }

    #[tokio::test]
    async fn upload_rejects_plain_text() {
        let (status, body) = send_json(
            &app(),
            "POST",
            "/api/sessions/upload",
            Some(json!({"filename": "export.csv", "contents": "De;À"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Upload is not a data URI");
    }

    #[tokio::test]
    async fn fetched_sessions_are_downloadable_as_pdf() {
        let app = app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/sessions/fetch",
            Some(json!({"period_start": "2025-05-01", "period_end": "2025-05-31"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sessions"], 2);

        let (status, headers, bytes) = send(
            &app,
            "POST",
            "/api/reports/monthly",
            Some(json!({"period_start": "2025-05-01", "period_end": "2025-05-31"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/pdf");
        assert!(headers["content-disposition"]
            .to_str()
            .unwrap()
            .contains("expense_report_2025-05-01_2025-05-31.pdf"));
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text() {
        let (status, headers, _) = send(&app(), "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
