//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, validated JSON extractor
//! - `modules`: one handler module per resource
//! - `router`: route table with Swagger documentation

pub mod common;
pub mod modules;
pub mod router;
pub mod state;

pub use router::create_api_router;
pub use state::AppState;
