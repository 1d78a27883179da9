//! Automation orchestrator
//!
//! Runs the monthly pipeline for one period:
//!
//! ```text
//! initialized → fetch_data → generate_pdf → send_email → completed
//!                                                      ↘ error
//! ```
//!
//! Every stage boundary is its own ledger write, so an interrupted run is
//! left at the last step it reached. Fatal conditions are caught here,
//! recorded as `error`/`failed`, and followed by a best-effort alert email.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::ports::{NotifierFactory, ReportRenderer, SessionSourceFactory};
use crate::application::services::cost::{
    distinct_stations, filter_sessions, price_sessions_for_report,
};
use super::TariffStore;
use crate::application::settings::{resolve_settings, AutomationDefaults, ResolvedSettings};
use crate::domain::{MonthlyReport, Period, RunLedger, RunStatus, RunStep, RunUpdate};
use crate::shared::errors::{AutomationError, RenderError};

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Scheduled,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// Fate of the alert email sent after a failed run.
#[derive(Debug)]
pub enum AlertDelivery {
    /// The run did not fail.
    NotNeeded,
    Sent,
    /// Not enough SMTP settings to try.
    Skipped,
    /// Always [`AutomationError::SecondaryNotificationFailed`].
    Failed(AutomationError),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub success: bool,
    pub message: String,
    pub run_id: i32,
    pub alert: AlertDelivery,
}

enum Completion {
    Delivered,
    NoSessions(String),
}

pub struct AutomationService {
    ledger: Arc<dyn RunLedger>,
    tariffs: Arc<TariffStore>,
    sources: Arc<dyn SessionSourceFactory>,
    renderer: Arc<dyn ReportRenderer>,
    notifiers: Arc<dyn NotifierFactory>,
    defaults: AutomationDefaults,
}

impl AutomationService {
    pub fn new(
        ledger: Arc<dyn RunLedger>,
        tariffs: Arc<TariffStore>,
        sources: Arc<dyn SessionSourceFactory>,
        renderer: Arc<dyn ReportRenderer>,
        notifiers: Arc<dyn NotifierFactory>,
        defaults: AutomationDefaults,
    ) -> Self {
        Self {
            ledger,
            tariffs,
            sources,
            renderer,
            notifiers,
            defaults,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn RunLedger> {
        &self.ledger
    }

    pub fn defaults(&self) -> &AutomationDefaults {
        &self.defaults
    }

    pub fn tariffs(&self) -> &Arc<TariffStore> {
        &self.tariffs
    }

    pub fn sources(&self) -> &Arc<dyn SessionSourceFactory> {
        &self.sources
    }

    pub fn renderer(&self) -> &Arc<dyn ReportRenderer> {
        &self.renderer
    }

    pub fn notifiers(&self) -> &Arc<dyn NotifierFactory> {
        &self.notifiers
    }

    /// Stored configuration resolved against the process defaults.
    pub async fn resolved_settings(&self) -> Result<ResolvedSettings, AutomationError> {
        let stored = self.ledger.config().get_all().await?;
        Ok(resolve_settings(&stored, &self.defaults))
    }

    /// Run the pipeline on its own task and return immediately.
    pub fn spawn_run(self: &Arc<Self>, period: Period, trigger: Trigger) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.run(period, trigger).await {
                error!(error = %e, %period, "❌ Automation run could not be recorded");
            }
        })
    }

    /// Run the pipeline to completion.
    ///
    /// Only a failure to create the ledger row is returned as `Err`; every
    /// later failure is recorded against the run and reported in the
    /// outcome.
    pub async fn run(&self, period: Period, trigger: Trigger) -> Result<RunOutcome, AutomationError> {
        let started = Instant::now();
        let run = self.ledger.runs().create(&period).await?;
        let run_id = run.id;

        info!(
            run_id,
            %trigger,
            period_start = %period.start,
            period_end = %period.end,
            "🚀 Automation run started"
        );

        let outcome = match self.execute(run_id, &period).await {
            Ok(Completion::Delivered) => {
                info!(run_id, "✅ Automation run completed");
                RunOutcome {
                    success: true,
                    message: "Success".to_string(),
                    run_id,
                    alert: AlertDelivery::NotNeeded,
                }
            }
            Ok(Completion::NoSessions(message)) => RunOutcome {
                success: false,
                message,
                run_id,
                alert: AlertDelivery::NotNeeded,
            },
            Err(e) => {
                let message = e.to_string();
                error!(run_id, step = "error", error = %message, "❌ Automation run failed");
                if let Err(le) = self
                    .ledger
                    .runs()
                    .update(run_id, RunUpdate::new(RunStep::Error, RunStatus::Failed, &message))
                    .await
                {
                    warn!(run_id, error = %le, "Could not record run failure");
                }
                let alert = self.send_alert(run_id, &period, &message).await;
                RunOutcome {
                    success: false,
                    message,
                    run_id,
                    alert,
                }
            }
        };

        let label = match (outcome.success, &outcome.alert) {
            (true, _) => "success",
            (false, AlertDelivery::NotNeeded) => "warning",
            (false, _) => "failed",
        };
        metrics::counter!("automation_runs_total", "outcome" => label).increment(1);
        metrics::histogram!("automation_run_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(outcome)
    }

    async fn step(&self, run_id: i32, update: RunUpdate) -> Result<(), AutomationError> {
        info!(
            run_id,
            step = %update.step,
            status = %update.status,
            message = %update.message,
            "Run progress"
        );
        self.ledger.runs().update(run_id, update).await?;
        Ok(())
    }

    async fn execute(&self, run_id: i32, period: &Period) -> Result<Completion, AutomationError> {
        let settings = self.resolved_settings().await?;
        settings.validate()?;
        let smtp = settings.smtp_settings()?;
        let target = settings.notification_email.clone();

        // fetch_data
        self.step(
            run_id,
            RunUpdate::new(RunStep::FetchData, RunStatus::Pending, "Connecting to provider..."),
        )
        .await?;

        let source = self.sources.create(&settings.provider_credentials());
        source
            .authenticate()
            .await
            .map_err(AutomationError::Authentication)?;

        let sessions = source
            .fetch_sessions(&settings.location_id, period)
            .await
            .unwrap_or_default();

        if sessions.is_empty() {
            let message = format!(
                "No sessions found for period {} - {}",
                period.start, period.end
            );
            warn!(run_id, "⚠️ {}", message);
            self.step(
                run_id,
                RunUpdate::new(RunStep::FetchData, RunStatus::Warning, &message),
            )
            .await?;
            return Ok(Completion::NoSessions(message));
        }

        self.step(
            run_id,
            RunUpdate::new(
                RunStep::FetchData,
                RunStatus::Success,
                format!("{} sessions retrieved", sessions.len()),
            ),
        )
        .await?;

        // generate_pdf
        self.step(
            run_id,
            RunUpdate::new(RunStep::GeneratePdf, RunStatus::Pending, "Generating PDF..."),
        )
        .await?;

        let vehicles = distinct_stations(&sessions);
        let tariffs = self.tariffs.load().await;
        let costed =
            price_sessions_for_report(filter_sessions(&sessions, period, &vehicles), &tariffs);
        let report = MonthlyReport::build(
            &costed,
            *period,
            &vehicles,
            &tariffs,
            Local::now().date_naive(),
        );

        let pdf_path = self.renderer.render_to_file(&report).await?;
        if !tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            return Err(RenderError::Missing(pdf_path).into());
        }
        let file_name = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.step(
            run_id,
            RunUpdate::new(
                RunStep::GeneratePdf,
                RunStatus::Success,
                format!("PDF generated: {}", file_name),
            )
            .with_pdf_path(pdf_path.to_string_lossy()),
        )
        .await?;

        // send_email
        self.step(
            run_id,
            RunUpdate::new(
                RunStep::SendEmail,
                RunStatus::Pending,
                format!("Sending to {}...", target),
            ),
        )
        .await?;

        let notifier = self
            .notifiers
            .create(&smtp)
            .map_err(AutomationError::Delivery)?;
        notifier
            .send_success(&target, period, Some(pdf_path.as_path()))
            .await
            .map_err(AutomationError::Delivery)?;

        self.step(
            run_id,
            RunUpdate::new(
                RunStep::SendEmail,
                RunStatus::Success,
                format!("Sent to {}", target),
            ),
        )
        .await?;

        self.step(
            run_id,
            RunUpdate::new(RunStep::Completed, RunStatus::Success, "Completed successfully"),
        )
        .await?;

        Ok(Completion::Delivered)
    }

    /// Best-effort error email. Never escalates: failures are logged and
    /// returned for inspection.
    async fn send_alert(&self, run_id: i32, period: &Period, detail: &str) -> AlertDelivery {
        let attempt = async {
            let settings = self.resolved_settings().await.map_err(|e| e.to_string())?;
            if !settings.can_alert() {
                return Ok(false);
            }
            let smtp = settings.smtp_settings().map_err(|e| e.to_string())?;
            let notifier = self.notifiers.create(&smtp).map_err(|e| e.to_string())?;
            notifier
                .send_error(&settings.notification_email, period, detail)
                .await
                .map_err(|e| e.to_string())?;
            Ok::<bool, String>(true)
        };

        match attempt.await {
            Ok(true) => {
                info!(run_id, "📧 Error notification sent");
                AlertDelivery::Sent
            }
            Ok(false) => {
                info!(run_id, "Error notification skipped: SMTP not configured");
                AlertDelivery::Skipped
            }
            Err(reason) => {
                warn!(run_id, error = %reason, "⚠️ Error notification failed");
                AlertDelivery::Failed(AutomationError::SecondaryNotificationFailed(reason))
            }
        }
    }
}
