pub mod ports;
pub mod services;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types for convenience
pub use ports::{
    Notifier, NotifierFactory, ProviderCredentials, ReportRenderer, SessionSource,
    SessionSourceFactory, SmtpSettings,
};
pub use services::{
    AlertDelivery, AutomationService, RunOutcome, ScheduleController, ScheduleStatus, TariffStore,
    Trigger,
};
pub use settings::{resolve_settings, AutomationDefaults, ResolvedSettings};
