//! Shared HTTP building blocks

mod validated_json;

pub use validated_json::{ValidatedJson, ValidatedJsonRejection};

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainError;
use crate::shared::errors::{AutomationError, ProviderError};

/// Standard response envelope.
///
/// Success: `{"success": true, "data": {...}}`,
/// failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

pub fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(message)))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    error(StatusCode::NOT_FOUND, message)
}

pub fn internal(message: impl Into<String>) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// Map a domain failure to its HTTP status.
pub fn domain_error(e: DomainError) -> ApiError {
    match e {
        DomainError::NotFound { .. } => not_found(e.to_string()),
        DomainError::Validation(_) | DomainError::StepRegression { .. } => bad_request(e.to_string()),
        DomainError::Storage(_) => internal(e.to_string()),
    }
}

/// Rejected credentials are the caller's to fix (400); an unreachable or
/// failing provider is an upstream fault (502).
pub fn provider_error(e: ProviderError) -> ApiError {
    match e {
        ProviderError::Authentication { .. } => bad_request(e.to_string()),
        other => error(StatusCode::BAD_GATEWAY, other.to_string()),
    }
}

pub fn automation_error(e: AutomationError) -> ApiError {
    match e {
        AutomationError::Ledger(inner) => domain_error(inner),
        AutomationError::Configuration(message) => bad_request(message),
        other => internal(other.to_string()),
    }
}

/// Inclusive date range carried by trigger, fetch and report requests.
#[derive(Debug, Clone, Deserialize, ToSchema, validator::Validate)]
pub struct PeriodRequest {
    #[validate(required(message = "period_start is required"))]
    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub period_start: Option<chrono::NaiveDate>,
    #[validate(required(message = "period_end is required"))]
    #[schema(value_type = String, format = Date, example = "2025-03-31")]
    pub period_end: Option<chrono::NaiveDate>,
}

impl PeriodRequest {
    pub fn period(&self) -> Result<crate::domain::Period, ApiError> {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => crate::domain::Period::new(start, end).map_err(domain_error),
            _ => Err(bad_request("period_start and period_end are required")),
        }
    }
}
