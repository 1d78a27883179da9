//! Automation run entity

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{RunStatus, RunStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Status {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Step {
    #[sea_orm(string_value = "initialized")]
    Initialized,
    #[sea_orm(string_value = "fetch_data")]
    FetchData,
    #[sea_orm(string_value = "generate_pdf")]
    GeneratePdf,
    #[sea_orm(string_value = "send_email")]
    SendEmail,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "error")]
    Error,
}

impl From<RunStatus> for Status {
    fn from(s: RunStatus) -> Self {
        match s {
            RunStatus::Pending => Self::Pending,
            RunStatus::Success => Self::Success,
            RunStatus::Warning => Self::Warning,
            RunStatus::Failed => Self::Failed,
        }
    }
}

impl From<Status> for RunStatus {
    fn from(s: Status) -> Self {
        match s {
            Status::Pending => Self::Pending,
            Status::Success => Self::Success,
            Status::Warning => Self::Warning,
            Status::Failed => Self::Failed,
        }
    }
}

impl From<RunStep> for Step {
    fn from(s: RunStep) -> Self {
        match s {
            RunStep::Initialized => Self::Initialized,
            RunStep::FetchData => Self::FetchData,
            RunStep::GeneratePdf => Self::GeneratePdf,
            RunStep::SendEmail => Self::SendEmail,
            RunStep::Completed => Self::Completed,
            RunStep::Error => Self::Error,
        }
    }
}

impl From<Step> for RunStep {
    fn from(s: Step) -> Self {
        match s {
            Step::Initialized => Self::Initialized,
            Step::FetchData => Self::FetchData,
            Step::GeneratePdf => Self::GeneratePdf,
            Step::SendEmail => Self::SendEmail,
            Step::Completed => Self::Completed,
            Step::Error => Self::Error,
        }
    }
}

/// One row per automation execution, updated in place.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "automation_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_date: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: Status,
    pub step: Step,
    pub message: String,
    /// Set once the report file exists.
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
