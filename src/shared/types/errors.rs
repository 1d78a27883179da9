use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Run {run_id} cannot move from step '{from}' to '{to}'")]
    StepRegression {
        run_id: i32,
        from: String,
        to: String,
    },
}

/// Failures talking to the metering provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication rejected ({status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid provider response: {0}")]
    Decode(String),
}

/// Delivery failures. The `Display` text is the message shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("SMTP authentication error (check credentials)")]
    Authentication,

    #[error("SMTP error: {0}")]
    Transport(String),

    #[error("Error while sending: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Report file was not produced: {}", .0.display())]
    Missing(PathBuf),

    #[error("Could not write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported image: {0}")]
    Image(String),
}

/// Errors raised while decoding an uploaded session export.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Upload is not a data URI")]
    NotDataUri,

    #[error("Upload payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Upload is not valid UTF-8 text")]
    Encoding,

    #[error("Missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("Malformed delimited file: {0}")]
    Csv(#[from] csv::Error),
}

/// Fatal conditions of an automation run. The `Display` text is what the
/// ledger records as the run message.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("{0}")]
    Configuration(String),

    #[error("Provider authentication failed: {0}")]
    Authentication(ProviderError),

    #[error("{0}")]
    Rendering(#[from] RenderError),

    #[error("Email delivery failed: {0}")]
    Delivery(NotifyError),

    #[error("Run ledger error: {0}")]
    Ledger(#[from] DomainError),

    #[error("Error notification could not be sent: {0}")]
    SecondaryNotificationFailed(String),
}
