//! Configuration REST API handlers

use std::collections::BTreeMap;

use axum::extract::State;
use tracing::{info, warn};

use super::dto::{
    ConfigResponse, TestEmailRequest, TestProviderRequest, TestResult, UpdateConfigRequest, MASK,
};
use crate::application::ports::{ProviderCredentials, SmtpSettings};
use crate::application::settings::{KNOWN_KEYS, SECRET_KEYS, SMTP_PORT};
use crate::interfaces::http::common::{
    automation_error, bad_request, domain_error, ok, provider_error, ApiResponse, ApiResult,
    ValidatedJson,
};
use crate::interfaces::http::state::AppState;

async fn current(state: &AppState) -> ApiResult<ConfigResponse> {
    let settings = state
        .automation
        .resolved_settings()
        .await
        .map_err(automation_error)?;

    let values = KNOWN_KEYS
        .iter()
        .map(|&key| {
            let value = settings.value(key).unwrap_or_default();
            let shown = if SECRET_KEYS.contains(&key) && !value.is_empty() {
                MASK.to_string()
            } else {
                value.to_string()
            };
            (key.to_string(), shown)
        })
        .collect();

    ok(ConfigResponse {
        values,
        schedule: state.scheduler.status().await.into(),
    })
}

#[utoipa::path(
    get,
    path = "/api/config",
    tag = "Config",
    responses(
        (status = 200, description = "Effective settings", body = ApiResponse<ConfigResponse>)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> ApiResult<ConfigResponse> {
    current(&state).await
}

fn check_values(values: &BTreeMap<String, String>) -> Result<(), String> {
    if values.is_empty() {
        return Err("values must not be empty".to_string());
    }
    if let Some(unknown) = values.keys().find(|k| !KNOWN_KEYS.contains(&k.as_str())) {
        return Err(format!("Unknown setting '{}'", unknown));
    }
    if let Some(port) = values.get(SMTP_PORT) {
        let port = port.trim();
        if !port.is_empty() && port.parse::<u16>().is_err() {
            return Err(format!("Invalid SMTP port '{}'", port));
        }
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/config",
    tag = "Config",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Saved; schedule reinstalled", body = ApiResponse<ConfigResponse>),
        (status = 400, description = "Unknown key or invalid value")
    )
)]
pub async fn update_config(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateConfigRequest>,
) -> ApiResult<ConfigResponse> {
    check_values(&req.values).map_err(bad_request)?;

    let config = state.automation.ledger().config();
    let mut saved = 0usize;
    for (key, value) in &req.values {
        if SECRET_KEYS.contains(&key.as_str()) && value == MASK {
            continue;
        }
        config
            .save(key, value.trim())
            .await
            .map_err(domain_error)?;
        saved += 1;
    }
    info!(saved, "⚙️ Configuration saved");

    state.scheduler.update_schedule().await;
    current(&state).await
}

#[utoipa::path(
    post,
    path = "/api/config/test-provider",
    tag = "Config",
    request_body = TestProviderRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = ApiResponse<TestResult>),
        (status = 400, description = "Missing fields or rejected credentials"),
        (status = 502, description = "Provider unreachable or failing")
    )
)]
pub async fn test_provider(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TestProviderRequest>,
) -> ApiResult<TestResult> {
    let source = state.automation.sources().create(&ProviderCredentials {
        client_id: req.client_id,
        client_secret: req.client_secret,
        location_id: String::new(),
    });
    match source.test_connection().await {
        Ok(message) => ok(TestResult { message }),
        Err(e) => {
            warn!(error = %e, "Provider connection test failed");
            Err(provider_error(e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/config/test-email",
    tag = "Config",
    request_body = TestEmailRequest,
    responses(
        (status = 200, description = "Test message sent", body = ApiResponse<TestResult>),
        (status = 400, description = "Missing fields, connection or delivery failure")
    )
)]
pub async fn test_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TestEmailRequest>,
) -> ApiResult<TestResult> {
    let settings = SmtpSettings {
        server: req.smtp_server,
        port: req.smtp_port,
        user: req.smtp_user,
        password: req.smtp_password,
    };
    let notifier = state
        .automation
        .notifiers()
        .create(&settings)
        .map_err(|e| bad_request(e.to_string()))?;

    notifier
        .test_connection()
        .await
        .map_err(|e| bad_request(e.to_string()))?;

    let message = notifier
        .send_test_message(&req.test_email)
        .await
        .map_err(|e| bad_request(e.to_string()))?;
    info!(to = %req.test_email, "📧 Test email sent");
    ok(TestResult { message })
}
