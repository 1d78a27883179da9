//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports for the collaborators the automation drives: the metering
//! provider, the report renderer and the notifier.

pub mod outbound;

pub use outbound::{
    Notifier, NotifierFactory, ProviderCredentials, ReportRenderer, SessionSource,
    SessionSourceFactory, SmtpSettings,
};
