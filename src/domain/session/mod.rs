//! Canonical charging sessions shared by every intake path.

pub mod model;

pub use model::{ChargingSession, CostedSession};
