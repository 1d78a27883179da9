//! Quarterly regulated tariffs

pub mod dto;
pub mod handlers;

pub use handlers::*;
