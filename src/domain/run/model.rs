use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, Period};

/// Outcome recorded for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Success,
    Warning,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::Validation(format!("unknown run status '{}'", other))),
        }
    }
}

/// Pipeline stage. Steps only move forward; `Completed` and `Error` are
/// terminal and share the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStep {
    Initialized,
    FetchData,
    GeneratePdf,
    SendEmail,
    Completed,
    Error,
}

impl RunStep {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Initialized => 0,
            Self::FetchData => 1,
            Self::GeneratePdf => 2,
            Self::SendEmail => 3,
            Self::Completed | Self::Error => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::FetchData => "fetch_data",
            Self::GeneratePdf => "generate_pdf",
            Self::SendEmail => "send_email",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialized" => Ok(Self::Initialized),
            "fetch_data" => Ok(Self::FetchData),
            "generate_pdf" => Ok(Self::GeneratePdf),
            "send_email" => Ok(Self::SendEmail),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(DomainError::Validation(format!("unknown run step '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRun {
    pub id: i32,
    pub run_date: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: RunStatus,
    pub step: RunStep,
    pub message: String,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationRun {
    /// A freshly created run: `initialized` / `pending`.
    pub fn initialized(id: i32, period: &Period, now: DateTime<Utc>) -> Self {
        Self {
            id,
            run_date: now,
            period_start: period.start,
            period_end: period.end,
            status: RunStatus::Pending,
            step: RunStep::Initialized,
            message: "initialized".to_string(),
            pdf_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn period(&self) -> Period {
        Period {
            start: self.period_start,
            end: self.period_end,
        }
    }

    /// Rejects moving to a lower-ranked step and any change after a
    /// terminal step.
    pub fn check_transition(&self, to: RunStep) -> DomainResult<()> {
        if self.step.is_terminal() || to.rank() < self.step.rank() {
            return Err(DomainError::StepRegression {
                run_id: self.id,
                from: self.step.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Apply an update in place. `pdf_path` is only overwritten when the
    /// update carries one.
    pub fn apply(&mut self, update: RunUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        self.check_transition(update.step)?;
        self.step = update.step;
        self.status = update.status;
        self.message = update.message;
        if update.pdf_path.is_some() {
            self.pdf_path = update.pdf_path;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// A stage-boundary mutation of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunUpdate {
    pub step: RunStep,
    pub status: RunStatus,
    pub message: String,
    pub pdf_path: Option<String>,
}

impl RunUpdate {
    pub fn new(step: RunStep, status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            step,
            status,
            message: message.into(),
            pdf_path: None,
        }
    }

    pub fn with_pdf_path(mut self, path: impl Into<String>) -> Self {
        self.pdf_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> AutomationRun {
        let period = Period::month_of(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        AutomationRun::initialized(7, &period, Utc::now())
    }

    #[test]
    fn steps_advance_and_may_repeat() {
        let mut r = run();
        let now = Utc::now();
        r.apply(RunUpdate::new(RunStep::FetchData, RunStatus::Pending, "connecting"), now)
            .unwrap();
        r.apply(RunUpdate::new(RunStep::FetchData, RunStatus::Success, "3 sessions"), now)
            .unwrap();
        r.apply(
            RunUpdate::new(RunStep::GeneratePdf, RunStatus::Success, "done").with_pdf_path("/tmp/a.pdf"),
            now,
        )
        .unwrap();
        r.apply(RunUpdate::new(RunStep::SendEmail, RunStatus::Pending, "sending"), now)
            .unwrap();
        assert_eq!(r.pdf_path.as_deref(), Some("/tmp/a.pdf"));
        assert_eq!(r.step, RunStep::SendEmail);
    }

    #[test]
    fn regression_is_rejected() {
        let mut r = run();
        r.apply(RunUpdate::new(RunStep::GeneratePdf, RunStatus::Pending, ""), Utc::now())
            .unwrap();
        let err = r
            .apply(RunUpdate::new(RunStep::FetchData, RunStatus::Success, ""), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::StepRegression { run_id: 7, .. }));
        assert_eq!(r.step, RunStep::GeneratePdf);
    }

    #[test]
    fn terminal_steps_are_final() {
        let mut r = run();
        r.apply(RunUpdate::new(RunStep::Error, RunStatus::Failed, "boom"), Utc::now())
            .unwrap();
        assert!(r
            .apply(RunUpdate::new(RunStep::Completed, RunStatus::Success, ""), Utc::now())
            .is_err());
        assert!(r
            .apply(RunUpdate::new(RunStep::Error, RunStatus::Failed, "again"), Utc::now())
            .is_err());
        assert_eq!(r.message, "boom");
    }

    #[test]
    fn string_forms_round_trip() {
        for step in [
            RunStep::Initialized,
            RunStep::FetchData,
            RunStep::GeneratePdf,
            RunStep::SendEmail,
            RunStep::Completed,
            RunStep::Error,
        ] {
            assert_eq!(step.as_str().parse::<RunStep>().unwrap(), step);
        }
        assert_eq!("warning".parse::<RunStatus>().unwrap(), RunStatus::Warning);
        assert!("done".parse::<RunStatus>().is_err());
    }
}
