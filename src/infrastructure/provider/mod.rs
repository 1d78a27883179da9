//! Metering provider adapters

pub mod smappee;

pub use smappee::{SmappeeSource, SmappeeSourceFactory, DEFAULT_BASE_URL};
