use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::interfaces::http::common::PeriodRequest;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MonthlyReportRequest {
    #[validate(required(message = "period_start is required"))]
    #[schema(value_type = String, format = Date)]
    pub period_start: Option<NaiveDate>,
    #[validate(required(message = "period_end is required"))]
    #[schema(value_type = String, format = Date)]
    pub period_end: Option<NaiveDate>,
    /// Vehicles to bill, in table order. Every cached vehicle when absent.
    #[serde(default)]
    pub vehicles: Option<Vec<String>>,
}

impl MonthlyReportRequest {
    pub fn period_request(&self) -> PeriodRequest {
        PeriodRequest {
            period_start: self.period_start,
            period_end: self.period_end,
        }
    }
}
