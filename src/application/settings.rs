//! Effective automation settings.
//!
//! Every setting is looked up the same way: the ledger's stored value when it
//! is present and non-blank, otherwise the process default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::application::ports::{ProviderCredentials, SmtpSettings};
use crate::domain::SchedulePolicy;
use crate::shared::errors::AutomationError;

pub const NOTIFICATION_EMAIL: &str = "notification_email";
pub const PROVIDER_CLIENT_ID: &str = "smappee_client_id";
pub const PROVIDER_CLIENT_SECRET: &str = "smappee_client_secret";
pub const PROVIDER_LOCATION_ID: &str = "smappee_location_id";
pub const SMTP_SERVER: &str = "smtp_server";
pub const SMTP_PORT: &str = "smtp_port";
pub const SMTP_USER: &str = "smtp_user";
pub const SMTP_PASSWORD: &str = "smtp_password";
pub const SCHEDULE_MODE: &str = "schedule_mode";
pub const SCHEDULE_TIME: &str = "schedule_time";

/// Keys whose values are never echoed back by the API.
pub const SECRET_KEYS: [&str; 2] = [PROVIDER_CLIENT_SECRET, SMTP_PASSWORD];

/// Keys accepted by the configuration API.
pub const KNOWN_KEYS: [&str; 10] = [
    NOTIFICATION_EMAIL,
    PROVIDER_CLIENT_ID,
    PROVIDER_CLIENT_SECRET,
    PROVIDER_LOCATION_ID,
    SMTP_SERVER,
    SMTP_PORT,
    SMTP_USER,
    SMTP_PASSWORD,
    SCHEDULE_MODE,
    SCHEDULE_TIME,
];

/// Process-level fallbacks, sourced from the config file and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationDefaults {
    pub notification_email: String,
    pub client_id: String,
    pub client_secret: String,
    pub location_id: String,
    pub smtp_server: String,
    pub smtp_port: String,
    pub smtp_user: String,
    pub smtp_password: String,
    pub schedule_mode: String,
    pub schedule_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub notification_email: String,
    pub client_id: String,
    pub client_secret: String,
    pub location_id: String,
    pub smtp_server: String,
    pub smtp_port: String,
    pub smtp_user: String,
    pub smtp_password: String,
    pub schedule_mode: String,
    pub schedule_time: String,
}

/// Resolve every setting against `stored`, falling back to `defaults`.
pub fn resolve_settings(
    stored: &HashMap<String, String>,
    defaults: &AutomationDefaults,
) -> ResolvedSettings {
    let pick = |key: &str, default: &str| -> String {
        stored
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    ResolvedSettings {
        notification_email: pick(NOTIFICATION_EMAIL, &defaults.notification_email),
        client_id: pick(PROVIDER_CLIENT_ID, &defaults.client_id),
        client_secret: pick(PROVIDER_CLIENT_SECRET, &defaults.client_secret),
        location_id: pick(PROVIDER_LOCATION_ID, &defaults.location_id),
        smtp_server: pick(SMTP_SERVER, &defaults.smtp_server),
        smtp_port: pick(SMTP_PORT, &defaults.smtp_port),
        smtp_user: pick(SMTP_USER, &defaults.smtp_user),
        smtp_password: pick(SMTP_PASSWORD, &defaults.smtp_password),
        schedule_mode: pick(SCHEDULE_MODE, &defaults.schedule_mode),
        schedule_time: pick(SCHEDULE_TIME, &defaults.schedule_time),
    }
}

impl ResolvedSettings {
    /// Pre-flight check run before any network call.
    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.notification_email.is_empty() {
            return Err(AutomationError::Configuration(
                "Notification email missing".into(),
            ));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() || self.location_id.is_empty()
        {
            return Err(AutomationError::Configuration(
                "Incomplete provider credentials".into(),
            ));
        }
        if self.smtp_server.is_empty() || self.smtp_user.is_empty() || self.smtp_password.is_empty()
        {
            return Err(AutomationError::Configuration(
                "Incomplete SMTP settings".into(),
            ));
        }
        self.smtp_settings().map(|_| ())
    }

    pub fn provider_credentials(&self) -> ProviderCredentials {
        ProviderCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            location_id: self.location_id.clone(),
        }
    }

    /// An empty port means 587; anything else must parse.
    pub fn smtp_settings(&self) -> Result<SmtpSettings, AutomationError> {
        let port = if self.smtp_port.is_empty() {
            SmtpSettings::DEFAULT_PORT
        } else {
            self.smtp_port.parse::<u16>().map_err(|_| {
                AutomationError::Configuration(format!("Invalid SMTP port '{}'", self.smtp_port))
            })?
        };
        Ok(SmtpSettings {
            server: self.smtp_server.clone(),
            port,
            user: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
        })
    }

    /// Enough SMTP settings to attempt an error notification.
    pub fn can_alert(&self) -> bool {
        !self.smtp_server.is_empty() && !self.smtp_user.is_empty()
    }

    pub fn schedule_policy(&self) -> SchedulePolicy {
        SchedulePolicy::from_config(&self.schedule_mode, &self.schedule_time)
    }

    /// Effective value of a stored key, `None` for keys outside [`KNOWN_KEYS`].
    pub fn value(&self, key: &str) -> Option<&str> {
        let value = match key {
            NOTIFICATION_EMAIL => &self.notification_email,
            PROVIDER_CLIENT_ID => &self.client_id,
            PROVIDER_CLIENT_SECRET => &self.client_secret,
            PROVIDER_LOCATION_ID => &self.location_id,
            SMTP_SERVER => &self.smtp_server,
            SMTP_PORT => &self.smtp_port,
            SMTP_USER => &self.smtp_user,
            SMTP_PASSWORD => &self.smtp_password,
            SCHEDULE_MODE => &self.schedule_mode,
            SCHEDULE_TIME => &self.schedule_time,
            _ => return None,
        };
        Some(value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScheduleMode;

    fn defaults() -> AutomationDefaults {
        AutomationDefaults {
            notification_email: "env@example.com".into(),
            client_id: "env-id".into(),
            client_secret: "env-secret".into(),
            location_id: "42".into(),
            smtp_server: "smtp.example.com".into(),
            smtp_port: "587".into(),
            smtp_user: "bot@example.com".into(),
            smtp_password: "pw".into(),
            schedule_mode: "last_day".into(),
            schedule_time: "23:59".into(),
        }
    }

    fn stored(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn stored_value_wins_when_non_blank() {
        let s = resolve_settings(
            &stored(&[(NOTIFICATION_EMAIL, "me@example.com"), (SMTP_USER, "   ")]),
            &defaults(),
        );
        assert_eq!(s.notification_email, "me@example.com");
        assert_eq!(s.smtp_user, "bot@example.com");
        assert_eq!(s.client_id, "env-id");
    }

    #[test]
    fn validation_reports_first_missing_group() {
        let mut d = defaults();
        d.notification_email.clear();
        d.client_secret.clear();
        let err = resolve_settings(&HashMap::new(), &d).validate().unwrap_err();
        assert_eq!(err.to_string(), "Notification email missing");

        d.notification_email = "x@example.com".into();
        let err = resolve_settings(&HashMap::new(), &d).validate().unwrap_err();
        assert_eq!(err.to_string(), "Incomplete provider credentials");
    }

    #[test]
    fn unparseable_port_is_a_configuration_error() {
        let s = resolve_settings(&stored(&[(SMTP_PORT, "smtp")]), &defaults());
        assert!(matches!(
            s.validate(),
            Err(AutomationError::Configuration(msg)) if msg.contains("smtp")
        ));
    }

    #[test]
    fn empty_port_defaults_to_submission_port() {
        let mut d = defaults();
        d.smtp_port.clear();
        let smtp = resolve_settings(&HashMap::new(), &d).smtp_settings().unwrap();
        assert_eq!(smtp.port, 587);
    }

    #[test]
    fn schedule_policy_comes_from_resolved_values() {
        let s = resolve_settings(
            &stored(&[(SCHEDULE_MODE, "first_day"), (SCHEDULE_TIME, "07:05")]),
            &defaults(),
        );
        let policy = s.schedule_policy();
        assert_eq!(policy.mode, ScheduleMode::FirstDay);
        assert_eq!((policy.hour, policy.minute), (7, 5));
    }

    #[test]
    fn every_known_key_has_a_value() {
        let s = resolve_settings(&HashMap::new(), &defaults());
        for key in KNOWN_KEYS {
            assert!(s.value(key).is_some(), "{key}");
        }
        assert_eq!(s.value(SMTP_USER), Some("bot@example.com"));
        assert_eq!(s.value("latest_api_cache"), None);
    }
}
