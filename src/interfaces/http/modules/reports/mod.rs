//! On-demand report download

pub mod dto;
pub mod handlers;

pub use handlers::*;
