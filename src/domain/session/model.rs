use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};

/// A normalized charging event.
///
/// Times are local wall-clock times. The serialized field names are the
/// ones stored in the cached dataset blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSession {
    pub station_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: i64,
    #[serde(rename = "energyConsumed_kWh", with = "rust_decimal::serde::float")]
    pub energy_kwh: Decimal,
    pub vehicle_id: String,
}

impl ChargingSession {
    pub fn new(
        station_name: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        duration_minutes: i64,
        energy_kwh: Decimal,
        vehicle_id: impl Into<String>,
    ) -> DomainResult<Self> {
        let session = Self {
            station_name: station_name.into(),
            start_time,
            end_time,
            duration_minutes,
            energy_kwh,
            vehicle_id: vehicle_id.into(),
        };
        session.validate()?;
        Ok(session)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.end_time < self.start_time {
            return Err(DomainError::Validation(format!(
                "session ends ({}) before it starts ({})",
                self.end_time, self.start_time
            )));
        }
        if self.duration_minutes < 0 {
            return Err(DomainError::Validation(format!(
                "negative session duration: {}",
                self.duration_minutes
            )));
        }
        if self.energy_kwh < Decimal::ZERO {
            return Err(DomainError::Validation(format!(
                "negative energy: {} kWh",
                self.energy_kwh
            )));
        }
        Ok(())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_time.date()
    }
}

/// A session with the per-kWh tariff applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CostedSession {
    pub session: ChargingSession,
    pub tariff: Decimal,
    pub cost: Decimal,
}

impl CostedSession {
    pub fn priced(session: ChargingSession, tariff: Decimal) -> Self {
        let cost = session.energy_kwh * tariff;
        Self {
            session,
            tariff,
            cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn end_before_start_is_rejected() {
        let result = ChargingSession::new(
            "Garage",
            at("2025-03-02 10:00:00"),
            at("2025-03-02 09:59:59"),
            0,
            dec!(1),
            "Garage",
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn negative_energy_is_rejected() {
        let result = ChargingSession::new(
            "Garage",
            at("2025-03-02 10:00:00"),
            at("2025-03-02 11:00:00"),
            60,
            dec!(-0.5),
            "Garage",
        );
        assert!(result.is_err());
    }

    #[test]
    fn cost_is_energy_times_tariff() {
        let s = ChargingSession::new(
            "Garage",
            at("2025-03-02 10:00:00"),
            at("2025-03-02 12:30:00"),
            150,
            dec!(10),
            "Garage",
        )
        .unwrap();
        let costed = CostedSession::priced(s, dec!(0.30));
        assert_eq!(costed.cost, dec!(3.00));
    }

    #[test]
    fn cached_blob_field_names() {
        let s = ChargingSession::new(
            "Borne 1",
            at("2025-03-02 10:00:00"),
            at("2025-03-02 11:00:00"),
            60,
            dec!(7.5),
            "Borne 1",
        )
        .unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["energyConsumed_kWh"], serde_json::json!(7.5));
        assert_eq!(json["startTime"], serde_json::json!("2025-03-02T10:00:00"));
        assert_eq!(json["vehicleId"], serde_json::json!("Borne 1"));
    }
}
