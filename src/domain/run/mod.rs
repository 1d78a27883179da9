//! Automation run aggregate
//!
//! One row per pipeline execution, mutated in place as the run advances.

pub mod model;
pub mod repository;

pub use model::{AutomationRun, RunStatus, RunStep, RunUpdate};
pub use repository::{purge_cutoff, ConfigRepository, RunRepository, CACHE_KEY};
