//! Session intake and dashboard analytics

pub mod dto;
pub mod handlers;

pub use handlers::*;
