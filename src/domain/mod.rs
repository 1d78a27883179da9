pub mod period;
pub mod report;
pub mod repositories;
pub mod run;
pub mod schedule;
pub mod session;
pub mod tariff;

// Re-export commonly used types
pub use period::{last_day_of_month, Period};
pub use report::{MonthlyReport, ReportLine};
pub use repositories::{DomainResult, RunLedger};
pub use run::{AutomationRun, ConfigRepository, RunRepository, RunStatus, RunStep, RunUpdate};
pub use schedule::{ScheduleMode, SchedulePolicy};
pub use session::{ChargingSession, CostedSession};
pub use tariff::{Quarter, TariffEntry, TariffRepository, TariffTable};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
