//! Ledger storage that does not need a database

mod memory;

pub use memory::InMemoryLedger;
