//! Session DTOs

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::services::cost::{
    Bucket, DurationBin, SessionStatistics, WeekdayConsumption,
};
use crate::domain::ChargingSession;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UploadRequest {
    pub filename: Option<String>,
    /// `data:<mime>;base64,<payload>` of the delimited export
    #[validate(length(min = 1, message = "contents is required"))]
    pub contents: String,
}

/// What the cached dataset now holds
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatasetSummary {
    pub sessions: usize,
    pub vehicles: Vec<String>,
    pub first_session: Option<NaiveDateTime>,
    pub last_session: Option<NaiveDateTime>,
}

impl DatasetSummary {
    pub fn of(sessions: &[ChargingSession]) -> Self {
        Self {
            sessions: sessions.len(),
            vehicles: crate::application::services::cost::distinct_vehicles(sessions),
            first_session: sessions.iter().map(|s| s.start_time).min(),
            last_session: sessions.iter().map(|s| s.start_time).max(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Comma-separated vehicle ids. All vehicles when absent.
    pub vehicles: Option<String>,
}

impl SummaryQuery {
    pub fn vehicle_filter(&self) -> Option<Vec<String>> {
        let list: Vec<String> = self
            .vehicles
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect();
        (!list.is_empty()).then_some(list)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Vehicles included in the figures
    pub vehicles: Vec<String>,
    /// Every vehicle in the cached dataset
    pub available_vehicles: Vec<String>,
    #[schema(value_type = Object)]
    pub statistics: SessionStatistics,
    #[schema(value_type = Vec<Object>)]
    pub monthly: Vec<Bucket>,
    #[schema(value_type = Vec<Object>)]
    pub weekly: Vec<Bucket>,
    #[schema(value_type = Vec<Object>)]
    pub weekdays: Vec<WeekdayConsumption>,
    #[schema(value_type = Vec<Object>)]
    pub durations: Vec<DurationBin>,
}
