//! Session intake from uploaded exports

pub mod csv_upload;

pub use csv_upload::{decode_upload, parse_sessions, parse_upload};
