//! Configuration module
//!
//! `AppConfig` is read from a TOML file. Every section and field has a
//! default, so an empty file is a valid configuration. Environment
//! variables are applied on top with [`AppConfig::apply_env_overrides`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::settings::AutomationDefaults;
use crate::domain::schedule::{SchedulePolicy, ScheduleMode};
use crate::infrastructure::provider::DEFAULT_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub storage: StorageSection,
    pub provider: ProviderSection,
    pub smtp: SmtpSection,
    pub schedule: ScheduleSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8050,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Full connection URL. Derived from `storage.data_dir` when unset.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub data_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub tariff_file: Option<PathBuf>,
    /// JPEG drawn in the report header.
    pub logo_path: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: None,
            tariff_file: None,
            logo_path: None,
        }
    }
}

impl StorageSection {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("generated_pdfs"))
    }

    pub fn tariff_file(&self) -> PathBuf {
        self.tariff_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("creg_tariffs.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub location_id: String,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            location_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSection {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub notification_email: String,
}

impl Default for SmtpSection {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
            notification_email: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub mode: String,
    pub time: String,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::LastDay.as_str().to_string(),
            time: format!(
                "{:02}:{:02}",
                SchedulePolicy::DEFAULT_HOUR,
                SchedulePolicy::DEFAULT_MINUTE
            ),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn connection_url(&self) -> String {
        self.database.url.clone().unwrap_or_else(|| {
            format!(
                "sqlite://{}?mode=rwc",
                self.storage.data_dir.join("automations.db").display()
            )
        })
    }

    /// Apply the process environment on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("HOST") {
            self.server.api_host = v;
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            self.server.api_port = port;
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("RECHARGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SMAPPEE_BASE_URL") {
            self.provider.base_url = v;
        }
        if let Some(v) = get("SMAPPEE_CLIENT_ID") {
            self.provider.client_id = v;
        }
        if let Some(v) = get("SMAPPEE_CLIENT_SECRET") {
            self.provider.client_secret = v;
        }
        if let Some(v) = get("SMAPPEE_LOCATION_ID") {
            self.provider.location_id = v;
        }
        if let Some(v) = get("SMTP_SERVER") {
            self.smtp.server = v;
        }
        if let Some(port) = get("SMTP_PORT").and_then(|v| v.parse().ok()) {
            self.smtp.port = port;
        }
        if let Some(v) = get("SMTP_USER") {
            self.smtp.user = v;
        }
        if let Some(v) = get("SMTP_PASSWORD") {
            self.smtp.password = v;
        }
        if let Some(v) = get("NOTIFICATION_EMAIL") {
            self.smtp.notification_email = v;
        }
    }

    /// Fallback values for settings not stored in the ledger.
    pub fn automation_defaults(&self) -> AutomationDefaults {
        AutomationDefaults {
            notification_email: self.smtp.notification_email.clone(),
            client_id: self.provider.client_id.clone(),
            client_secret: self.provider.client_secret.clone(),
            location_id: self.provider.location_id.clone(),
            smtp_server: self.smtp.server.clone(),
            smtp_port: self.smtp.port.to_string(),
            smtp_user: self.smtp.user.clone(),
            smtp_password: self.smtp.password.clone(),
            schedule_mode: self.schedule.mode.clone(),
            schedule_time: self.schedule.time.clone(),
        }
    }
}

/// `<config_dir>/recharge/config.toml`, or `./config.toml` when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("recharge").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}
