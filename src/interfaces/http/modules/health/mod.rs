//! Liveness probe

pub mod handlers;

pub use handlers::*;
