//! Monthly expense report content.
//!
//! Layout-free: renderers decide how to draw it, this only decides what it
//! says.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::period::Period;
use super::session::CostedSession;
use super::tariff::{Quarter, TariffTable};

pub const REPORT_TITLE: &str = "Monthly expense report - EV charging";

pub const TARIFF_NOTE: &str = "The CREG tariff (Belgian electricity and gas regulator) is used by \
the federal finance administration to compute the reimbursement of electricity costs for home charging.";

/// VAT applied on top of the regulated rate.
pub fn vat_rate() -> Decimal {
    Decimal::new(6, 2)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub vehicle: String,
    pub description: String,
    pub energy_kwh: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub title: String,
    pub period: Period,
    pub period_label: String,
    pub issued_on: NaiveDate,
    pub quarter: Quarter,
    /// Day-weighted rate over the whole period, per kWh excluding VAT.
    pub rate: Decimal,
    pub rate_incl_vat: Decimal,
    pub lines: Vec<ReportLine>,
    pub total_energy: Decimal,
    pub total_cost: Decimal,
}

impl MonthlyReport {
    /// One line per requested vehicle, in the requested order. A vehicle
    /// without sessions still gets a zero line.
    pub fn build(
        costed: &[CostedSession],
        period: Period,
        vehicles: &[String],
        tariffs: &TariffTable,
        issued_on: NaiveDate,
    ) -> Self {
        let period_label = period.label();
        let rate = tariffs.resolve_range(period.start, period.end);

        let lines = vehicles
            .iter()
            .map(|vehicle| {
                let (energy_kwh, cost) = costed
                    .iter()
                    .filter(|c| &c.session.vehicle_id == vehicle)
                    .fold((Decimal::ZERO, Decimal::ZERO), |(kwh, cost), c| {
                        (kwh + c.session.energy_kwh, cost + c.cost)
                    });
                ReportLine {
                    vehicle: vehicle.clone(),
                    description: period_label.clone(),
                    energy_kwh,
                    cost,
                }
            })
            .collect();

        Self {
            title: REPORT_TITLE.to_string(),
            period,
            period_label,
            issued_on,
            quarter: Quarter::from_date(period.start),
            rate,
            rate_incl_vat: rate * (Decimal::ONE + vat_rate()),
            lines,
            total_energy: costed.iter().map(|c| c.session.energy_kwh).sum(),
            total_cost: costed.iter().map(|c| c.cost).sum(),
        }
    }

    pub fn issued_label(&self) -> String {
        format!("Issued on {}", self.issued_on.format("%d/%m/%Y"))
    }

    pub fn rate_label(&self) -> String {
        format!(
            "{} : {:.4} € excl. VAT/kWh ({:.4} € incl. VAT/kWh)",
            self.quarter, self.rate, self.rate_incl_vat
        )
    }

    pub fn summary(&self) -> String {
        format!(
            "An expense claim of {:.2} € can be made for {}.",
            self.total_cost, self.period_label
        )
    }
}
