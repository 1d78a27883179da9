//! Monthly trigger rule for the automation.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::period::{last_day_of_month, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Last calendar day of every month at `HH:MM:59`.
    LastDay,
    /// Day 1 of every month at `HH:MM:00`.
    FirstDay,
    Disabled,
}

impl ScheduleMode {
    /// Unknown or empty values select [`ScheduleMode::LastDay`].
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim() {
            "first_day" => Self::FirstDay,
            "disabled" => Self::Disabled,
            _ => Self::LastDay,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastDay => "last_day",
            Self::FirstDay => "first_day",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub mode: ScheduleMode,
    pub hour: u32,
    pub minute: u32,
}

impl SchedulePolicy {
    pub const DEFAULT_HOUR: u32 = 23;
    pub const DEFAULT_MINUTE: u32 = 59;

    /// Build from stored strings. A malformed `time` falls back to 23:59.
    pub fn from_config(mode: &str, time: &str) -> Self {
        let (hour, minute) = parse_time(time).unwrap_or((Self::DEFAULT_HOUR, Self::DEFAULT_MINUTE));
        Self {
            mode: ScheduleMode::parse_lenient(mode),
            hour,
            minute,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != ScheduleMode::Disabled
    }

    pub fn time_label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// The single firing instant of this policy within a calendar month.
    pub fn fire_time_in_month(&self, year: i32, month: u32) -> Option<NaiveDateTime> {
        match self.mode {
            ScheduleMode::LastDay => last_day_of_month(year, month).and_hms_opt(self.hour, self.minute, 59),
            ScheduleMode::FirstDay => NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(self.hour, self.minute, 0),
            ScheduleMode::Disabled => None,
        }
    }

    /// First firing instant strictly after `now`.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let this_month = self.fire_time_in_month(now.year(), now.month())?;
        if this_month > now {
            return Some(this_month);
        }
        let (year, month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        self.fire_time_in_month(year, month)
    }

    /// Period a firing on `fire_date` processes: the previous month when
    /// fired on the 1st, otherwise the current month.
    pub fn target_period(fire_date: NaiveDate) -> Period {
        if fire_date.day() == 1 {
            Period::previous_month(fire_date)
        } else {
            Period::month_of(fire_date)
        }
    }
}

fn parse_time(time: &str) -> Option<(u32, u32)> {
    let (hour, minute) = time.trim().split_once(':')?;
    let hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn malformed_time_falls_back_to_2359() {
        for bad in ["", "noon", "25:00", "12:60", "12"] {
            let p = SchedulePolicy::from_config("last_day", bad);
            assert_eq!((p.hour, p.minute), (23, 59), "input {bad:?}");
        }
        let p = SchedulePolicy::from_config("first_day", "06:30");
        assert_eq!((p.hour, p.minute), (6, 30));
    }

    #[test]
    fn unknown_mode_means_last_day() {
        assert_eq!(SchedulePolicy::from_config("weekly", "10:00").mode, ScheduleMode::LastDay);
        assert!(!SchedulePolicy::from_config("disabled", "10:00").is_enabled());
    }

    #[test]
    fn last_day_fires_on_true_month_end() {
        let p = SchedulePolicy::from_config("last_day", "23:59");
        assert_eq!(p.fire_time_in_month(2025, 2), Some(at(2025, 2, 28, 23, 59, 59)));
        assert_eq!(p.fire_time_in_month(2024, 2), Some(at(2024, 2, 29, 23, 59, 59)));
        assert_eq!(p.fire_time_in_month(2025, 4), Some(at(2025, 4, 30, 23, 59, 59)));
        assert_eq!(p.fire_time_in_month(2025, 1), Some(at(2025, 1, 31, 23, 59, 59)));
    }

    #[test]
    fn first_day_fires_at_second_zero() {
        let p = SchedulePolicy::from_config("first_day", "08:15");
        assert_eq!(
            p.next_fire_after(at(2025, 1, 1, 8, 15, 0)),
            Some(at(2025, 2, 1, 8, 15, 0))
        );
        assert_eq!(
            p.next_fire_after(at(2025, 1, 1, 8, 14, 59)),
            Some(at(2025, 1, 1, 8, 15, 0))
        );
    }

    #[test]
    fn next_fire_rolls_over_year_end() {
        let p = SchedulePolicy::from_config("last_day", "22:00");
        assert_eq!(
            p.next_fire_after(at(2025, 12, 31, 22, 0, 59)),
            Some(at(2026, 1, 31, 22, 0, 59))
        );
    }

    #[test]
    fn disabled_never_fires() {
        let p = SchedulePolicy::from_config("disabled", "22:00");
        assert_eq!(p.next_fire_after(at(2025, 6, 1, 0, 0, 0)), None);
    }

    #[test]
    fn firing_on_first_targets_previous_month() {
        let period = SchedulePolicy::target_period(date(2025, 3, 1));
        assert_eq!(period.start, date(2025, 2, 1));
        assert_eq!(period.end, date(2025, 2, 28));
    }

    #[test]
    fn firing_mid_or_end_of_month_targets_current_month() {
        let period = SchedulePolicy::target_period(date(2024, 2, 29));
        assert_eq!(period.start, date(2024, 2, 1));
        assert_eq!(period.end, date(2024, 2, 29));
    }
}
