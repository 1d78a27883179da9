//! Outbound email

pub mod smtp;

pub use smtp::{SmtpNotifier, SmtpNotifierFactory};
