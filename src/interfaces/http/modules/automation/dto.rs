//! Automation DTOs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::application::services::ScheduleStatus;
use crate::domain::{AutomationRun, Period};

/// Run accepted for background execution
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TriggerAccepted {
    pub status: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub message: String,
}

impl TriggerAccepted {
    pub fn for_period(period: &Period) -> Self {
        Self {
            status: "accepted".to_string(),
            period_start: period.start,
            period_end: period.end,
            message: "Automation started in the background".to_string(),
        }
    }
}

/// One ledger row
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunDto {
    pub id: i32,
    pub run_date: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// pending, success, warning or failed
    pub status: String,
    /// initialized, fetch_data, generate_pdf, send_email, completed or error
    pub step: String,
    pub message: String,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AutomationRun> for RunDto {
    fn from(run: AutomationRun) -> Self {
        Self {
            id: run.id,
            run_date: run.run_date,
            period_start: run.period_start,
            period_end: run.period_end,
            status: run.status.to_string(),
            step: run.step.to_string(),
            message: run.message,
            pdf_path: run.pdf_path,
            created_at: run.created_at,
            updated_at: run.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunListResponse {
    pub total: u64,
    pub runs: Vec<RunDto>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusQuery {
    /// Maximum number of runs, newest first (default 10, at most 100)
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PurgeQuery {
    /// Delete runs older than this many days (default 90)
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduleDto {
    /// last_day, first_day or disabled
    pub mode: String,
    /// HH:MM
    pub time: String,
    pub armed: bool,
    pub next_fire: Option<NaiveDateTime>,
}

impl From<ScheduleStatus> for ScheduleDto {
    fn from(s: ScheduleStatus) -> Self {
        Self {
            mode: s.mode.to_string(),
            time: s.time,
            armed: s.armed,
            next_fire: s.next_fire,
        }
    }
}
