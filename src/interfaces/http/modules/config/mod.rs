//! Stored settings and connection tests

pub mod dto;
pub mod handlers;

pub use handlers::*;
