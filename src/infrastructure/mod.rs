//! Infrastructure layer - external concerns

pub mod database;
pub mod intake;
pub mod notifications;
pub mod provider;
pub mod report;
pub mod storage;
pub mod tariffs;

pub use database::{init_database, DatabaseConfig, SeaOrmRunLedger};
pub use notifications::SmtpNotifierFactory;
pub use provider::SmappeeSourceFactory;
pub use report::PdfReportRenderer;
pub use storage::InMemoryLedger;
pub use tariffs::JsonTariffRepository;
