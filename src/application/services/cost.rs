//! Cost engine and session analytics
//!
//! Pure functions over canonical sessions: filtering, pricing and the
//! aggregates shown by the summary endpoint and the monthly report.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::{ChargingSession, CostedSession, Period, TariffTable};

/// Sessions starting inside `period` whose vehicle is in `vehicles`.
pub fn filter_sessions(
    sessions: &[ChargingSession],
    period: &Period,
    vehicles: &[String],
) -> Vec<ChargingSession> {
    sessions
        .iter()
        .filter(|s| period.contains(s.start_date()) && vehicles.contains(&s.vehicle_id))
        .cloned()
        .collect()
}

/// Dashboard pricing: each session at the rate of its start date.
pub fn price_sessions(sessions: Vec<ChargingSession>, tariffs: &TariffTable) -> Vec<CostedSession> {
    sessions
        .into_iter()
        .map(|s| {
            let rate = tariffs.resolve(s.start_date());
            CostedSession::priced(s, rate)
        })
        .collect()
}

/// Report pricing: each session at the range rate of the single day it
/// started on. Identical to [`price_sessions`] by construction.
pub fn price_sessions_for_report(
    sessions: Vec<ChargingSession>,
    tariffs: &TariffTable,
) -> Vec<CostedSession> {
    sessions
        .into_iter()
        .map(|s| {
            let day = s.start_date();
            let rate = tariffs.resolve_range(day, day);
            CostedSession::priced(s, rate)
        })
        .collect()
}

fn distinct_by(sessions: &[ChargingSession], field: impl Fn(&ChargingSession) -> &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for s in sessions {
        let value = field(s);
        if !seen.iter().any(|v| v == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

/// Distinct vehicle ids in first-seen order.
pub fn distinct_vehicles(sessions: &[ChargingSession]) -> Vec<String> {
    distinct_by(sessions, |s| &s.vehicle_id)
}

/// Distinct station names in first-seen order.
pub fn distinct_stations(sessions: &[ChargingSession]) -> Vec<String> {
    distinct_by(sessions, |s| &s.station_name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatistics {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_consumption_kwh: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    /// Zero when there are no sessions.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_session_kwh: Decimal,
    pub total_sessions: usize,
}

pub fn statistics(costed: &[CostedSession]) -> SessionStatistics {
    let total_consumption_kwh: Decimal = costed.iter().map(|c| c.session.energy_kwh).sum();
    let total_cost: Decimal = costed.iter().map(|c| c.cost).sum();
    let average_session_kwh = if costed.is_empty() {
        Decimal::ZERO
    } else {
        total_consumption_kwh / Decimal::from(costed.len())
    };

    SessionStatistics {
        total_consumption_kwh,
        total_cost,
        average_session_kwh,
        total_sessions: costed.len(),
    }
}

/// Energy and cost summed over one bucket (month or week).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// First day of the bucket.
    pub start: NaiveDate,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub energy_kwh: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
}

fn bucketed(
    costed: &[CostedSession],
    key: impl Fn(NaiveDate) -> NaiveDate,
    label: impl Fn(NaiveDate) -> String,
) -> Vec<Bucket> {
    let mut sums: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for c in costed {
        let entry = sums.entry(key(c.session.start_date())).or_default();
        entry.0 += c.session.energy_kwh;
        entry.1 += c.cost;
    }
    sums.into_iter()
        .map(|(start, (energy_kwh, cost))| Bucket {
            start,
            label: label(start),
            energy_kwh,
            cost,
        })
        .collect()
}

/// Per calendar month, chronological. Labels are `YYYY-MM`.
pub fn monthly_breakdown(costed: &[CostedSession]) -> Vec<Bucket> {
    bucketed(
        costed,
        |d| d.with_day(1).unwrap_or(d),
        |d| d.format("%Y-%m").to_string(),
    )
}

/// Per Monday-started week, chronological.
pub fn weekly_breakdown(costed: &[CostedSession]) -> Vec<Bucket> {
    bucketed(
        costed,
        |d| d - Duration::days(i64::from(d.weekday().num_days_from_monday())),
        |d| d.format("%Y-%m-%d").to_string(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayConsumption {
    pub weekday: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub energy_kwh: Decimal,
}

/// Energy per weekday, Monday first, all seven days present.
pub fn weekday_consumption(costed: &[CostedSession]) -> Vec<WeekdayConsumption> {
    let mut totals = [Decimal::ZERO; 7];
    for c in costed {
        let idx = c.session.start_time.weekday().num_days_from_monday() as usize;
        totals[idx] += c.session.energy_kwh;
    }

    const DAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    DAYS.iter()
        .zip(totals)
        .map(|(day, energy_kwh)| WeekdayConsumption {
            weekday: weekday_name(*day).to_string(),
            energy_kwh,
        })
        .collect()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationBin {
    pub hours: i64,
    pub sessions: usize,
}

/// Session count per duration rounded to whole hours (half to even),
/// with empty hours between the shortest and longest filled in as zero.
pub fn duration_distribution(sessions: &[ChargingSession]) -> Vec<DurationBin> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for s in sessions {
        let hours = (Decimal::from(s.duration_minutes) / Decimal::from(60))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        let hours = i64::try_from(hours).unwrap_or(0);
        *counts.entry(hours).or_default() += 1;
    }

    let (Some(&min), Some(&max)) = (counts.keys().next(), counts.keys().next_back()) else {
        return Vec::new();
    };
    (min..=max)
        .map(|hours| DurationBin {
            hours,
            sessions: counts.get(&hours).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TariffEntry;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn session(vehicle: &str, start: &str, minutes: i64, kwh: Decimal) -> ChargingSession {
        let start = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap();
        ChargingSession::new(
            vehicle,
            start,
            start + Duration::minutes(minutes),
            minutes,
            kwh,
            vehicle,
        )
        .unwrap()
    }

    fn tariffs() -> TariffTable {
        TariffTable::from_entries([
            TariffEntry { quarter: "Q1/2025".parse().unwrap(), price: dec!(32.56) },
            TariffEntry { quarter: "Q2/2025".parse().unwrap(), price: dec!(36.18) },
        ])
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn filter_keeps_period_and_vehicle_matches() {
        let sessions = vec![
            session("A", "2025-03-31 23:30", 60, dec!(5)),
            session("A", "2025-04-01 08:00", 60, dec!(5)),
            session("B", "2025-04-02 08:00", 60, dec!(5)),
        ];
        let period = Period::month_of(date(2025, 4, 1));
        let kept = filter_sessions(&sessions, &period, &["A".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start_date(), date(2025, 4, 1));
    }

    #[test]
    fn both_pricing_paths_agree() {
        let sessions = vec![
            session("A", "2025-03-31 23:30", 60, dec!(7.25)),
            session("A", "2025-04-01 00:10", 60, dec!(3.5)),
        ];
        let t = tariffs();
        assert_eq!(
            price_sessions(sessions.clone(), &t),
            price_sessions_for_report(sessions, &t)
        );
    }

    #[test]
    fn cost_uses_start_date_quarter() {
        let costed = price_sessions(
            vec![session("A", "2025-03-31 23:30", 120, dec!(10))],
            &tariffs(),
        );
        assert_eq!(costed[0].tariff, dec!(0.3256));
        assert_eq!(costed[0].cost, dec!(3.256));
    }

    #[test]
    fn statistics_of_empty_set_are_zero() {
        let stats = statistics(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.average_session_kwh, Decimal::ZERO);
    }

    #[test]
    fn statistics_aggregate() {
        let costed = price_sessions(
            vec![
                session("A", "2025-02-03 18:00", 60, dec!(10)),
                session("B", "2025-02-04 18:00", 60, dec!(5)),
            ],
            &tariffs(),
        );
        let stats = statistics(&costed);
        assert_eq!(stats.total_consumption_kwh, dec!(15));
        assert_eq!(stats.average_session_kwh, dec!(7.5));
        assert_eq!(stats.total_cost, dec!(4.884));
    }

    #[test]
    fn breakdowns_group_by_month_week_and_weekday() {
        let costed = price_sessions(
            vec![
                // Wednesday and Sunday of the same week
                session("A", "2025-01-29 18:00", 60, dec!(1)),
                session("A", "2025-02-02 18:00", 60, dec!(2)),
                session("A", "2025-02-03 18:00", 60, dec!(4)),
            ],
            &tariffs(),
        );

        let months = monthly_breakdown(&costed);
        assert_eq!(months.len(), 2);
        assert_eq!(months[1].label, "2025-02");
        assert_eq!(months[1].energy_kwh, dec!(6));

        let weeks = weekly_breakdown(&costed);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].start, date(2025, 1, 27));
        assert_eq!(weeks[0].energy_kwh, dec!(3));

        let days = weekday_consumption(&costed);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].weekday, "Monday");
        assert_eq!(days[0].energy_kwh, dec!(4));
        assert_eq!(days[6].energy_kwh, dec!(2));
        assert_eq!(days[3].energy_kwh, Decimal::ZERO);
    }

    #[test]
    fn duration_distribution_fills_gaps() {
        let sessions = vec![
            session("A", "2025-01-01 10:00", 30, dec!(1)),  // 0.5h rounds to 0
            session("A", "2025-01-02 10:00", 90, dec!(1)),  // 1.5h rounds to 2
            session("A", "2025-01-03 10:00", 200, dec!(1)), // 3.33h rounds to 3
        ];
        let bins = duration_distribution(&sessions);
        let hours: Vec<_> = bins.iter().map(|b| (b.hours, b.sessions)).collect();
        assert_eq!(hours, vec![(0, 1), (1, 0), (2, 1), (3, 1)]);
    }
}
