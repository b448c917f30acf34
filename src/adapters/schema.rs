//! Typed mapping between the store's field bags and the domain entities.
//!
//! Records that do not decode are logged and dropped here so that nothing
//! untyped travels further in.

use crate::domain::model::{
    AvailabilityRecord, AvailabilityStatus, Chauffeur, Event, EventStatus, FieldBag, StoreRecord,
};
use crate::domain::ports::Table;
use crate::utils::error::{StoreError, StoreResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};

pub mod fields {
    pub const NAME: &str = "Name";

    pub const EVENT_NAME: &str = "Event name";
    pub const STARTS_AT: &str = "Starts at";
    pub const STOPS_AT: &str = "Stops at";
    pub const CITY: &str = "Location City";
    pub const TRAVEL_TIME: &str = "Travel Time";
    pub const STATUS: &str = "Status";

    pub const EVENT: &str = "Event";
    pub const CHAUFFEURS: &str = "Chauffeurs";
    pub const AVAILABILITY: &str = "Availability";
}

/// Fields requested from the store for each table.
pub fn projection(table: Table) -> &'static [&'static str] {
    match table {
        Table::Chauffeurs => &[fields::NAME],
        Table::Events => &[
            fields::EVENT_NAME,
            fields::STARTS_AT,
            fields::STOPS_AT,
            fields::CITY,
            fields::TRAVEL_TIME,
            fields::STATUS,
        ],
        Table::Availability => &[fields::AVAILABILITY, fields::CHAUFFEURS, fields::EVENT],
    }
}

fn malformed(record: &StoreRecord, reason: impl Into<String>) -> StoreError {
    StoreError::MalformedRecord {
        id: record.id.clone(),
        reason: reason.into(),
    }
}

fn required_str<'a>(record: &'a StoreRecord, field: &str) -> StoreResult<&'a str> {
    match record.fields.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(other) => Err(malformed(
            record,
            format!("field '{}' is not a non-empty string: {}", field, other),
        )),
        None => Err(malformed(record, format!("missing field '{}'", field))),
    }
}

fn optional_str<'a>(record: &'a StoreRecord, field: &str) -> Option<&'a str> {
    record.fields.get(field).and_then(Value::as_str)
}

/// First element of a linked-record field (`["recXXX"]`). A bare string is
/// tolerated.
fn first_link(record: &StoreRecord, field: &str) -> StoreResult<String> {
    match record.fields.get(field) {
        Some(Value::Array(items)) => items
            .first()
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed(record, format!("linked field '{}' is empty", field))),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(malformed(
            record,
            format!("linked field '{}' has unexpected value {}", field, other),
        )),
        None => Err(malformed(record, format!("missing linked field '{}'", field))),
    }
}

fn timestamp(record: &StoreRecord, field: &str) -> StoreResult<DateTime<Utc>> {
    let raw = required_str(record, field)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| malformed(record, format!("field '{}' is not a timestamp: {}", field, raw)))
}

/// Durations arrive as a number of seconds, or as `H:MM` / `H:MM:SS` text.
fn parse_travel_time(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?.round();
            if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
                return None;
            }
            Duration::try_seconds(secs as i64)
        }
        Value::String(s) => {
            let parts: Vec<&str> = s.trim().split(':').collect();
            let numbers: Option<Vec<i64>> = parts.iter().map(|p| p.parse::<i64>().ok()).collect();
            match numbers?.as_slice() {
                [h, m] => Duration::try_hours(*h)?.checked_add(&Duration::try_minutes(*m)?),
                [h, m, sec] => Duration::try_hours(*h)?
                    .checked_add(&Duration::try_minutes(*m)?)?
                    .checked_add(&Duration::try_seconds(*sec)?),
                _ => None,
            }
        }
        _ => None,
    }
}

pub fn decode_chauffeur(record: &StoreRecord) -> StoreResult<Chauffeur> {
    Ok(Chauffeur {
        id: record.id.clone(),
        name: required_str(record, fields::NAME)?.to_string(),
    })
}

pub fn decode_event(record: &StoreRecord) -> StoreResult<Event> {
    let travel_time = match record.fields.get(fields::TRAVEL_TIME) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let parsed = parse_travel_time(value);
            if parsed.is_none() {
                tracing::warn!(
                    "Event {}: ignoring unreadable travel time {}",
                    record.id,
                    value
                );
            }
            parsed
        }
    };

    Ok(Event {
        id: record.id.clone(),
        name: required_str(record, fields::EVENT_NAME)?.to_string(),
        starts_at: timestamp(record, fields::STARTS_AT)?,
        stops_at: timestamp(record, fields::STOPS_AT)?,
        city: optional_str(record, fields::CITY).unwrap_or_default().to_string(),
        travel_time,
        status: optional_str(record, fields::STATUS).map(EventStatus::from_wire),
    })
}

pub fn decode_availability(record: &StoreRecord) -> StoreResult<AvailabilityRecord> {
    let status = match record.fields.get(fields::AVAILABILITY) {
        None | Some(Value::Null) => AvailabilityStatus::Unset,
        Some(Value::String(s)) if s.is_empty() => AvailabilityStatus::Unset,
        Some(Value::String(s)) => AvailabilityStatus::from_wire(s)
            .ok_or_else(|| malformed(record, format!("unknown availability '{}'", s)))?,
        Some(other) => {
            return Err(malformed(
                record,
                format!("availability is not a string: {}", other),
            ))
        }
    };

    Ok(AvailabilityRecord {
        id: record.id.clone(),
        event_id: first_link(record, fields::EVENT)?,
        chauffeur_id: first_link(record, fields::CHAUFFEURS)?,
        status,
    })
}

/// Decodes every record, logging and skipping the malformed ones.
pub fn decode_all<T>(
    table: Table,
    records: &[StoreRecord],
    decode: impl Fn(&StoreRecord) -> StoreResult<T>,
) -> Vec<T> {
    let mut decoded = Vec::with_capacity(records.len());
    for record in records {
        match decode(record) {
            Ok(item) => decoded.push(item),
            Err(e) => tracing::warn!("Skipping {} record: {}", table, e),
        }
    }
    decoded
}

/// Field bag written on create and update. `status` must be set.
pub fn encode_availability(
    event_id: &str,
    chauffeur_id: &str,
    status: AvailabilityStatus,
) -> FieldBag {
    let mut bag = FieldBag::new();
    bag.insert(fields::EVENT.to_string(), json!([event_id]));
    bag.insert(fields::CHAUFFEURS.to_string(), json!([chauffeur_id]));
    if let Some(wire) = status.as_wire() {
        bag.insert(fields::AVAILABILITY.to_string(), json!(wire));
    }
    bag
}
