//! Database repository implementations
//!
//! Per-table SeaORM repositories combined into one `RunLedger`.

pub mod config_repository;
pub mod ledger;
pub mod run_repository;

pub use ledger::SeaOrmRunLedger;
