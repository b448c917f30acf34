use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Field bag as returned by the external record store.
pub type FieldBag = HashMap<String, serde_json::Value>;

/// An identified, untyped record straight from the store. Only the adapter
/// layer looks inside `fields`; everything above works with the typed
/// entities below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    #[serde(default)]
    pub fields: FieldBag,
}

impl StoreRecord {
    pub fn new(id: impl Into<String>, fields: FieldBag) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chauffeur {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Draft,
    Confirmed,
    Other(String),
}

impl EventStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Self::Draft,
            "confirmed" => Self::Confirmed,
            _ => Self::Other(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub stops_at: DateTime<Utc>,
    pub city: String,
    #[serde(skip)]
    pub travel_time: Option<Duration>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    Available,
    NotAvailable,
    MaybeAvailable,
    #[default]
    Unset,
}

impl AvailabilityStatus {
    /// The string stored in the `Availability` field. `Unset` has no stored
    /// form.
    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            Self::Available => Some("Available"),
            Self::NotAvailable => Some("Not Available"),
            Self::MaybeAvailable => Some("Maybe Available"),
            Self::Unset => None,
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "Available" => Some(Self::Available),
            "Not Available" => Some(Self::NotAvailable),
            "Maybe Available" => Some(Self::MaybeAvailable),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire().unwrap_or("Select Availability"))
    }
}

impl FromStr for AvailabilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(status) = Self::from_wire(s) {
            return Ok(status);
        }
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "available" => Ok(Self::Available),
            "notavailable" => Ok(Self::NotAvailable),
            "maybeavailable" | "maybe" => Ok(Self::MaybeAvailable),
            "unset" => Ok(Self::Unset),
            _ => Err(format!(
                "unknown availability '{}': expected Available, Not Available or Maybe Available",
                s
            )),
        }
    }
}

/// Natural key of an availability record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub event_id: String,
    pub chauffeur_id: String,
}

impl PairKey {
    pub fn new(event_id: impl Into<String>, chauffeur_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            chauffeur_id: chauffeur_id.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.event_id, self.chauffeur_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub id: String,
    pub event_id: String,
    pub chauffeur_id: String,
    pub status: AvailabilityStatus,
}

impl AvailabilityRecord {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.event_id.clone(), self.chauffeur_id.clone())
    }

    pub fn matches(&self, event_id: &str, chauffeur_id: &str) -> bool {
        self.event_id == event_id && self.chauffeur_id == chauffeur_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(AvailabilityStatus::NotAvailable.as_wire(), Some("Not Available"));
        assert_eq!(
            AvailabilityStatus::from_wire("Maybe Available"),
            Some(AvailabilityStatus::MaybeAvailable)
        );
        assert_eq!(AvailabilityStatus::from_wire("maybe available"), None);
        assert_eq!(AvailabilityStatus::Unset.as_wire(), None);
    }

    #[test]
    fn test_status_parses_cli_forms() {
        assert_eq!("available".parse(), Ok(AvailabilityStatus::Available));
        assert_eq!("not-available".parse(), Ok(AvailabilityStatus::NotAvailable));
        assert_eq!("Maybe_Available".parse(), Ok(AvailabilityStatus::MaybeAvailable));
        assert!("sometimes".parse::<AvailabilityStatus>().is_err());
    }

    #[test]
    fn test_event_status_keeps_unknown_values() {
        assert_eq!(EventStatus::from_wire("Confirmed"), EventStatus::Confirmed);
        assert_eq!(
            EventStatus::from_wire("Cancelled"),
            EventStatus::Other("Cancelled".to_string())
        );
    }
}
