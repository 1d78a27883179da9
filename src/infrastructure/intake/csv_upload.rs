use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::domain::ChargingSession;
use crate::shared::errors::IntakeError;

pub const COL_STATION: &str = "Nom de la borne de recharge";
pub const COL_START: &str = "De";
pub const COL_END: &str = "À";
pub const COL_DURATION: &str = "Durée [h:mm]";
pub const COL_ENERGY: &str = "kWh";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Decode a `data:<mime>;base64,<payload>` URI into UTF-8 text, without BOM.
pub fn decode_upload(contents: &str) -> Result<String, IntakeError> {
    let (header, payload) = contents
        .trim()
        .split_once(',')
        .ok_or(IntakeError::NotDataUri)?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(IntakeError::NotDataUri);
    }

    let bytes = STANDARD.decode(payload.trim())?;
    let text = String::from_utf8(bytes).map_err(|_| IntakeError::Encoding)?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Decode and parse an uploaded export in one go.
pub fn parse_upload(contents: &str) -> Result<Vec<ChargingSession>, IntakeError> {
    parse_sessions(&decode_upload(contents)?)
}

/// Parse a delimited session export into canonical sessions.
///
/// The delimiter is `;` when the header line contains one, `,` otherwise.
/// Rows with unreadable timestamps or energy are skipped; an unreadable
/// duration counts as zero minutes.
pub fn parse_sessions(text: &str) -> Result<Vec<ChargingSession>, IntakeError> {
    let text = text.trim_start_matches('\u{feff}');
    let header_line = text.lines().next().unwrap_or_default();
    let delimiter = if header_line.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(IntakeError::MissingColumn(name))
    };
    let station_idx = column(COL_STATION)?;
    let start_idx = column(COL_START)?;
    let end_idx = column(COL_END)?;
    let duration_idx = column(COL_DURATION)?;
    let energy_idx = column(COL_ENERGY)?;

    let mut sessions = Vec::new();
    let mut skipped = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let parsed = parse_datetime(field(start_idx))
            .ok_or_else(|| format!("unreadable start '{}'", field(start_idx)))
            .and_then(|start| {
                let end = parse_datetime(field(end_idx))
                    .ok_or_else(|| format!("unreadable end '{}'", field(end_idx)))?;
                let energy = parse_energy(field(energy_idx))
                    .ok_or_else(|| format!("unreadable energy '{}'", field(energy_idx)))?;
                let station = field(station_idx);
                ChargingSession::new(
                    station,
                    start,
                    end,
                    parse_duration(field(duration_idx)),
                    energy,
                    station,
                )
                .map_err(|e| e.to_string())
            });

        match parsed {
            Ok(session) => sessions.push(session),
            Err(reason) => {
                skipped += 1;
                warn!(row = row + 2, reason = %reason, "⚠️ Skipping malformed session row");
            }
        }
    }

    info!(sessions = sessions.len(), skipped, "📄 Session export parsed");
    Ok(sessions)
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// `h:mm` to minutes; anything unreadable is zero.
fn parse_duration(value: &str) -> i64 {
    let mut parts = value.trim().split(':');
    let hours = parts.next().and_then(|h| h.trim().parse::<i64>().ok());
    let minutes = parts.next().and_then(|m| m.trim().parse::<i64>().ok());
    match (hours, minutes) {
        (Some(h), Some(m)) if h >= 0 && m >= 0 => h
            .checked_mul(60)
            .and_then(|total| total.checked_add(m))
            .unwrap_or(0),
        _ => 0,
    }
}

fn parse_energy(value: &str) -> Option<Decimal> {
    Decimal::from_str(&value.trim().replace(',', ".")).ok()
}
