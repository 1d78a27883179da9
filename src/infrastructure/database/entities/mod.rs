//! Database entities module

pub mod automation_config;
pub mod automation_run;

pub use automation_config::Entity as AutomationConfig;
pub use automation_run::Entity as AutomationRun;
