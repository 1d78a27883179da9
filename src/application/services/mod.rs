//! Application services

mod automation;
pub mod cost;
mod scheduler;
mod tariff_store;

pub use automation::{AlertDelivery, AutomationService, RunOutcome, Trigger};
pub use scheduler::{fire, Clock, LocalClock, ScheduleController, ScheduleStatus};
pub use tariff_store::TariffStore;
