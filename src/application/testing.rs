//! Test doubles for the outbound ports.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;

use crate::application::ports::{
    Notifier, NotifierFactory, ProviderCredentials, ReportRenderer, SessionSource,
    SessionSourceFactory, SmtpSettings,
};
use crate::application::settings::AutomationDefaults;
use crate::domain::{
    ChargingSession, DomainError, DomainResult, MonthlyReport, Period, TariffRepository,
    TariffTable,
};
use crate::shared::errors::{NotifyError, ProviderError, RenderError};

pub fn session(vehicle: &str, start: &str, kwh: Decimal) -> ChargingSession {
    let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap();
    ChargingSession::new(vehicle, start, start + Duration::hours(1), 60, kwh, vehicle).unwrap()
}

pub fn complete_defaults() -> AutomationDefaults {
    AutomationDefaults {
        notification_email: "owner@example.com".into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        location_id: "1234".into(),
        smtp_server: "smtp.example.com".into(),
        smtp_port: "587".into(),
        smtp_user: "bot@example.com".into(),
        smtp_password: "pw".into(),
        schedule_mode: "last_day".into(),
        schedule_time: "23:59".into(),
    }
}

// ── Tariffs ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryTariffRepository {
    table: Mutex<Option<TariffTable>>,
    saves: AtomicUsize,
}

impl MemoryTariffRepository {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(table: TariffTable) -> Self {
        Self {
            table: Mutex::new(Some(table)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn stored(&self) -> Option<TariffTable> {
        self.table.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TariffRepository for MemoryTariffRepository {
    async fn load(&self) -> DomainResult<TariffTable> {
        self.table
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DomainError::Storage("no tariff document".into()))
    }

    async fn save(&self, table: &TariffTable) -> DomainResult<()> {
        *self.table.lock().unwrap() = Some(table.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Provider ───────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StubAuth {
    Accept,
    Reject,
    Unreachable,
}

pub struct StubSource {
    pub auth: StubAuth,
    pub sessions: Option<Vec<ChargingSession>>,
    pub fetches: AtomicUsize,
}

impl StubSource {
    fn with(auth: StubAuth, sessions: Option<Vec<ChargingSession>>) -> Arc<Self> {
        Arc::new(Self {
            auth,
            sessions,
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn returning(sessions: Vec<ChargingSession>) -> Arc<Self> {
        Self::with(StubAuth::Accept, Some(sessions))
    }

    pub fn rejecting_credentials() -> Arc<Self> {
        Self::with(StubAuth::Reject, None)
    }

    pub fn unreachable() -> Arc<Self> {
        Self::with(StubAuth::Unreachable, None)
    }
}

#[async_trait]
impl SessionSource for StubSource {
    async fn authenticate(&self) -> Result<(), ProviderError> {
        match self.auth {
            StubAuth::Accept => Ok(()),
            StubAuth::Reject => Err(ProviderError::Authentication {
                status: 401,
                body: "invalid_client".into(),
            }),
            StubAuth::Unreachable => Err(ProviderError::Transport("connection refused".into())),
        }
    }

    async fn fetch_sessions(
        &self,
        _location_id: &str,
        _period: &Period,
    ) -> Option<Vec<ChargingSession>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.sessions.clone()
    }
}

pub struct StubSourceFactory(pub Arc<StubSource>);

impl SessionSourceFactory for StubSourceFactory {
    fn create(&self, _credentials: &ProviderCredentials) -> Arc<dyn SessionSource> {
        self.0.clone()
    }
}

// ── Renderer ───────────────────────────────────────────────────

/// Writes a placeholder file, or pretends to and writes nothing.
pub struct StubRenderer {
    dir: tempfile::TempDir,
    produce_file: bool,
    pub rendered: Mutex<Vec<MonthlyReport>>,
}

impl StubRenderer {
    pub fn writing() -> Arc<Self> {
        Arc::new(Self {
            dir: tempfile::tempdir().unwrap(),
            produce_file: true,
            rendered: Mutex::new(Vec::new()),
        })
    }

    pub fn losing_output() -> Arc<Self> {
        Arc::new(Self {
            dir: tempfile::tempdir().unwrap(),
            produce_file: false,
            rendered: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ReportRenderer for StubRenderer {
    fn render(&self, report: &MonthlyReport) -> Result<Vec<u8>, RenderError> {
        self.rendered.lock().unwrap().push(report.clone());
        Ok(b"%PDF-stub".to_vec())
    }

    async fn render_to_file(&self, report: &MonthlyReport) -> Result<PathBuf, RenderError> {
        let bytes = self.render(report)?;
        let path = self.dir.path().join(format!(
            "expense_report_{}_{}.pdf",
            report.period.start, report.period.end
        ));
        if self.produce_file {
            std::fs::write(&path, bytes)?;
        }
        Ok(path)
    }
}

// ── Notifier ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Test { to: String },
    Success { to: String, attachment: Option<PathBuf> },
    Error { to: String, detail: String },
}

pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Sent>>,
    pub success_result: Result<String, NotifyError>,
    pub error_result: Result<String, NotifyError>,
}

impl RecordingNotifier {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            success_result: Ok("Email sent successfully".into()),
            error_result: Ok("Email sent successfully".into()),
        })
    }

    pub fn failing(error: NotifyError) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            success_result: Err(error.clone()),
            error_result: Err(error),
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn test_connection(&self) -> Result<String, NotifyError> {
        Ok("SMTP connection successful".into())
    }

    async fn send_test_message(&self, to: &str) -> Result<String, NotifyError> {
        self.sent.lock().unwrap().push(Sent::Test { to: to.into() });
        self.success_result.clone()
    }

    async fn send_success(
        &self,
        to: &str,
        _period: &Period,
        attachment: Option<&Path>,
    ) -> Result<String, NotifyError> {
        self.sent.lock().unwrap().push(Sent::Success {
            to: to.into(),
            attachment: attachment.map(Path::to_path_buf),
        });
        self.success_result.clone()
    }

    async fn send_error(
        &self,
        to: &str,
        _period: &Period,
        detail: &str,
    ) -> Result<String, NotifyError> {
        self.sent.lock().unwrap().push(Sent::Error {
            to: to.into(),
            detail: detail.into(),
        });
        self.error_result.clone()
    }
}

pub struct RecordingNotifierFactory(pub Arc<RecordingNotifier>);

impl NotifierFactory for RecordingNotifierFactory {
    fn create(&self, _settings: &SmtpSettings) -> Result<Arc<dyn Notifier>, NotifyError> {
        Ok(self.0.clone())
    }
}
