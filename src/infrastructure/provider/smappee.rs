//! Smappee v3 REST client
//!
//! OAuth2 client-credentials authentication and charging session listing.
//! Sessions come back as raw JSON records with millisecond timestamps; each
//! record is converted on its own so a single bad record never sinks the
//! batch.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::application::ports::{ProviderCredentials, SessionSource, SessionSourceFactory};
use crate::domain::{ChargingSession, Period};
use crate::shared::errors::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://app1pub.smappee.net/dev/v3";

/// Station name used when a record carries none.
const DEFAULT_STATION_NAME: &str = "Borne Smappee";

const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

pub struct SmappeeSource {
    base_url: String,
    credentials: ProviderCredentials,
    client: Client,
    token: Mutex<Option<AccessToken>>,
}

impl SmappeeSource {
    pub fn new(client: Client, base_url: impl Into<String>, credentials: ProviderCredentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            client,
            token: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<AccessToken, ProviderError> {
        let url = format!("{}/oauth2/token", self.base_url);
        info!("🔑 Authenticating with Smappee");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "❌ Smappee authentication rejected");
            return Err(ProviderError::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let lifetime = token
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
            .saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);

        info!(expires_in = lifetime, "✅ Smappee authentication successful");
        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }

    /// Cached bearer token, renewed when absent or expired.
    async fn bearer(&self) -> Result<String, ProviderError> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_valid()) {
            return Ok(token.value.clone());
        }
        debug!("🔄 Renewing Smappee token");
        let token = self.request_token().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    async fn list_sessions(
        &self,
        location_id: &str,
        period: &Period,
    ) -> Result<Vec<ChargingSession>, ProviderError> {
        let bearer = self.bearer().await?;
        let (from, to) = period_bounds_ms(period);
        let url = format!(
            "{}/servicelocation/{}/chargingsessions",
            self.base_url, location_id
        );

        info!(location_id, from, to, "📡 Requesting Smappee charging sessions");
        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .query(&[("from", from), ("to", to)])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let records = payload
            .as_array()
            .ok_or_else(|| ProviderError::Decode("expected a list of sessions".into()))?;

        debug!(records = records.len(), "📥 Raw sessions received");
        Ok(records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match session_from_record(record) {
                Ok(session) => Some(session),
                Err(reason) => {
                    warn!(index, reason = %reason, "⚠️ Skipping malformed Smappee session");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl SessionSource for SmappeeSource {
    async fn authenticate(&self) -> Result<(), ProviderError> {
        let token = self.request_token().await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    async fn fetch_sessions(
        &self,
        location_id: &str,
        period: &Period,
    ) -> Option<Vec<ChargingSession>> {
        match self.list_sessions(location_id, period).await {
            Ok(sessions) => Some(sessions),
            Err(e) => {
                error!(error = %e, location_id, "❌ Smappee session fetch failed");
                None
            }
        }
    }
}

/// Builds one client per resolved credential set, sharing the HTTP pool.
pub struct SmappeeSourceFactory {
    client: Client,
    base_url: String,
}

impl SmappeeSourceFactory {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl SessionSourceFactory for SmappeeSourceFactory {
    fn create(&self, credentials: &ProviderCredentials) -> Arc<dyn SessionSource> {
        Arc::new(SmappeeSource::new(
            self.client.clone(),
            self.base_url.clone(),
            credentials.clone(),
        ))
    }
}

/// Local midnight of the first day to 23:59:59 of the last day, as epoch ms.
fn period_bounds_ms(period: &Period) -> (i64, i64) {
    let from = local_millis(period.start.and_time(NaiveTime::MIN));
    let to = local_millis(end_of_day(period.end));
    (from, to)
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

fn local_millis(at: NaiveDateTime) -> i64 {
    match Local.from_local_datetime(&at).earliest() {
        Some(local) => local.timestamp_millis(),
        // Wall time skipped by a DST jump
        None => Utc.from_utc_datetime(&at).timestamp_millis(),
    }
}

fn local_from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.with_timezone(&Local).naive_local())
}

fn millis_field(record: &Value, field: &str) -> Result<i64, String> {
    match record.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| format!("'{}' is not a timestamp", field)),
        Some(Value::Null) | None => Err(format!("missing '{}'", field)),
        Some(other) => Err(format!("'{}' is not a timestamp: {}", field, other)),
    }
}

fn energy_field(record: &Value) -> Result<Decimal, String> {
    match record.get("volume") {
        None | Some(Value::Null) => Ok(Decimal::ZERO),
        Some(Value::Number(n)) => {
            Decimal::from_str(&n.to_string()).map_err(|e| format!("bad volume {}: {}", n, e))
        }
        Some(Value::String(s)) => Decimal::from_str(s.trim().replace(',', ".").as_str())
            .map_err(|e| format!("bad volume '{}': {}", s, e)),
        Some(other) => Err(format!("bad volume: {}", other)),
    }
}

/// Convert one provider record to the canonical session shape. The station
/// name doubles as the vehicle identifier since records carry no badge id.
pub(crate) fn session_from_record(record: &Value) -> Result<ChargingSession, String> {
    let start_ms = millis_field(record, "startTime")?;
    let stop_ms = millis_field(record, "stopTime")?;
    let start = local_from_millis(start_ms).ok_or("startTime out of range")?;
    let stop = local_from_millis(stop_ms).ok_or("stopTime out of range")?;

    let station = record
        .get("chargingStationName")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_STATION_NAME);

    let minutes = (stop - start).num_minutes();
    ChargingSession::new(station, start, stop, minutes, energy_field(record)?, station)
        .map_err(|e| e.to_string())
}
