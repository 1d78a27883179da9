//! Tariff aggregate
//!
//! Quarterly regulator prices (currency minor units per kWh) and the
//! resolution rules that turn them into a per-kWh rate for a date or a range.

pub mod model;
pub mod repository;

pub use model::{Quarter, TariffEntry, TariffTable};
pub use repository::TariffRepository;
