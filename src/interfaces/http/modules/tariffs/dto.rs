//! Tariff DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::TariffEntry;

/// One quarter's price, in cents per kWh excluding VAT
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TariffDto {
    #[schema(example = "Q1/2026")]
    pub quarter: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 35.23)]
    pub price: Decimal,
}

impl From<TariffEntry> for TariffDto {
    fn from(e: TariffEntry) -> Self {
        Self {
            quarter: e.quarter.to_string(),
            price: e.price,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertTariffRequest {
    #[validate(length(min = 1, message = "quarter is required"))]
    #[schema(example = "Q2/2026")]
    pub quarter: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct QuarterQuery {
    /// Quarter label, `Qn/YYYY`
    pub quarter: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ResolveQuery {
    /// Single day to price
    pub date: Option<NaiveDate>,
    /// Range start, used with `end`
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Rate applied to a day or range, per kWh
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolvedRate {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub rate_incl_vat: Decimal,
}
