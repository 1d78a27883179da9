pub mod automation;
pub mod config;
pub mod health;
pub mod metrics;
pub mod reports;
pub mod sessions;
pub mod tariffs;
