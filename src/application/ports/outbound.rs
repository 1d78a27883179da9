//! Outbound ports
//!
//! The orchestrator only ever talks to these traits. Concrete adapters live
//! in `infrastructure` and are built per run from the resolved settings,
//! which is why each port comes with a factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChargingSession, MonthlyReport, Period};
use crate::shared::errors::{NotifyError, ProviderError, RenderError};

// ── Session source ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub location_id: String,
}

/// Metering provider session listing.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Obtain (or reuse) a bearer credential.
    async fn authenticate(&self) -> Result<(), ProviderError>;

    /// Sessions whose start falls in `period`, in the canonical schema.
    ///
    /// `None` and an empty list both mean "no sessions"; transport and
    /// decoding failures are logged by the adapter and surface as `None`.
    async fn fetch_sessions(
        &self,
        location_id: &str,
        period: &Period,
    ) -> Option<Vec<ChargingSession>>;

    async fn test_connection(&self) -> Result<String, ProviderError> {
        self.authenticate().await?;
        Ok("Authentication successful".to_string())
    }
}

pub trait SessionSourceFactory: Send + Sync {
    fn create(&self, credentials: &ProviderCredentials) -> Arc<dyn SessionSource>;
}

// ── Report renderer ────────────────────────────────────────────

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Render to memory, for immediate download.
    fn render(&self, report: &MonthlyReport) -> Result<Vec<u8>, RenderError>;

    /// Render and persist under the output directory with a unique,
    /// timestamped name. Returns the written path.
    async fn render_to_file(&self, report: &MonthlyReport) -> Result<PathBuf, RenderError>;
}

// ── Notifier ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl SmtpSettings {
    pub const DEFAULT_PORT: u16 = 587;
}

/// Email delivery. `Ok` carries the human success message, the error's
/// `Display` is the failure message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn test_connection(&self) -> Result<String, NotifyError>;

    async fn send_test_message(&self, to: &str) -> Result<String, NotifyError>;

    /// The attachment is skipped when `None` or missing on disk.
    async fn send_success(
        &self,
        to: &str,
        period: &Period,
        attachment: Option<&Path>,
    ) -> Result<String, NotifyError>;

    async fn send_error(
        &self,
        to: &str,
        period: &Period,
        detail: &str,
    ) -> Result<String, NotifyError>;
}

pub trait NotifierFactory: Send + Sync {
    fn create(&self, settings: &SmtpSettings) -> Result<Arc<dyn Notifier>, NotifyError>;
}
