//! Automation runs: trigger, history, schedule

pub mod dto;
pub mod handlers;

pub use handlers::*;
