use thiserror::Error;

/// Failures raised by a record store adapter. These never leave the
/// repository boundary; they are wrapped into [`AvailabilityError`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Record store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid store URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Record not found: {id}")]
    NotFound { id: String },

    #[error("Record store unavailable: {message}")]
    Unavailable { message: String },
}

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Failed to fetch {what}: {source}")]
    FetchFailed {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Failed to save availability for event {event_id} / chauffeur {chauffeur_id}: {source}")]
    StoreWriteFailed {
        event_id: String,
        chauffeur_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Missing configuration: {field}")]
    MissingConfiguration { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfiguration {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration file {path} could not be read: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Availability for event {event_id} / chauffeur {chauffeur_id} cannot be reset to unset")]
    UnsetNotAllowed {
        event_id: String,
        chauffeur_id: String,
    },

    #[error("No chauffeur selected")]
    NoChauffeurSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AvailabilityError {
    pub fn fetch(what: &'static str, source: StoreError) -> Self {
        Self::FetchFailed { what, source }
    }

    pub fn write(event_id: &str, chauffeur_id: &str, source: StoreError) -> Self {
        Self::StoreWriteFailed {
            event_id: event_id.to_string(),
            chauffeur_id: chauffeur_id.to_string(),
            source,
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::MissingConfiguration {
            field: field.to_string(),
        }
    }

    /// Configuration problems are fatal at start-up; store failures are
    /// surfaced to the user and retried by hand.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnsetNotAllowed { .. } | Self::NoChauffeurSelected => ErrorSeverity::Low,
            Self::FetchFailed { .. } => ErrorSeverity::Medium,
            Self::StoreWriteFailed { .. } => ErrorSeverity::High,
            Self::MissingConfiguration { .. }
            | Self::InvalidConfiguration { .. }
            | Self::ConfigFile { .. } => ErrorSeverity::Critical,
        }
    }

    /// Short banner text for the presentation layer.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::FetchFailed { what, .. } => format!("Failed to fetch {}", what),
            Self::StoreWriteFailed { .. } => "Failed to update availability".to_string(),
            Self::MissingConfiguration { field } => {
                format!("Missing record store configuration: {}", field)
            }
            Self::InvalidConfiguration { field, .. } => {
                format!("Invalid record store configuration: {}", field)
            }
            Self::ConfigFile { path, .. } => format!("Could not read configuration file {}", path),
            Self::UnsetNotAllowed { .. } => "Availability cannot be cleared once set".to_string(),
            Self::NoChauffeurSelected => "Select a chauffeur first".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "Check the network connection and refresh",
            Self::StoreWriteFailed { .. } => "The previous status was kept; select the status again",
            Self::MissingConfiguration { .. } => {
                "Set AIRTABLE_TOKEN and AIRTABLE_BASE_ID or pass --config <file>"
            }
            Self::InvalidConfiguration { .. } => "Fix the configuration value and restart",
            Self::ConfigFile { .. } => "Check the --config path and file permissions",
            Self::UnsetNotAllowed { .. } => "Pick Available, Not Available or Maybe Available",
            Self::NoChauffeurSelected => "Choose a chauffeur from the list",
        }
    }
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
