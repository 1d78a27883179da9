//! # Recharge automation service
//!
//! Collects EV-charging sessions from a metering provider, prices them with
//! quarterly regulator tariffs, renders a monthly expense report and mails it,
//! either on a recurring schedule or on demand.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: periods, quarters and tariffs, charging sessions, automation
//!   runs, schedule policy and the repository traits of the run ledger
//! - **application**: cost engine, tariff store, automation orchestrator,
//!   schedule controller and the outbound ports they drive
//! - **infrastructure**: SQLite ledger, tariff document, provider client,
//!   upload intake, PDF rendering, SMTP delivery
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: error taxonomy and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRunLedger};

pub use application::{AutomationService, RunOutcome, ScheduleController, Trigger};

pub use interfaces::http::{create_api_router, AppState};

pub use server::{init_tracing, run_once, ServerHandle, ServerOptions};
