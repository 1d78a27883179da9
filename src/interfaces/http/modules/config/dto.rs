//! Configuration DTOs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::super::automation::dto::ScheduleDto;

/// Replacement shown instead of secret values.
pub const MASK: &str = "********";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    /// Effective value of every known key. Secrets are masked.
    pub values: BTreeMap<String, String>,
    pub schedule: ScheduleDto,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateConfigRequest {
    /// Keys to store. A masked secret is left unchanged.
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TestProviderRequest {
    #[validate(length(min = 1, message = "client_id and client_secret are required"))]
    pub client_id: String,
    #[validate(length(min = 1, message = "client_id and client_secret are required"))]
    pub client_secret: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TestEmailRequest {
    #[validate(length(min = 1, message = "smtp_server is required"))]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[validate(length(min = 1, message = "smtp_user is required"))]
    pub smtp_user: String,
    #[validate(length(min = 1, message = "smtp_password is required"))]
    pub smtp_password: String,
    #[validate(email(message = "test_email must be an email address"))]
    pub test_email: String,
}

fn default_smtp_port() -> u16 {
    crate::application::ports::SmtpSettings::DEFAULT_PORT
}

/// Outcome of a connection test
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestResult {
    pub message: String,
}
