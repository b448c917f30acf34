#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{AvailabilityError, Result};
use crate::utils::validation::{
    validate_credential, validate_non_empty_string, validate_positive_number, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub const ENV_TOKEN: &str = "AIRTABLE_TOKEN";
pub const ENV_BASE_ID: &str = "AIRTABLE_BASE_ID";
pub const ENV_API_URL: &str = "AIRTABLE_API_URL";
pub const ENV_TIMEOUT: &str = "AIRTABLE_TIMEOUT_SECONDS";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub tables: TableNames,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub base_id: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

// Keeps the token out of `--verbose` output.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_url", &self.api_url)
            .field("token", &"***")
            .field("base_id", &self.base_id)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Table (and view) names in the remote base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNames {
    pub chauffeurs: String,
    pub chauffeur_view: Option<String>,
    pub events: String,
    pub availability: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            chauffeurs: "People".to_string(),
            chauffeur_view: Some("Chauffeurs".to_string()),
            events: "Events".to_string(),
            availability: "Availability".to_string(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn env_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

impl AppConfig {
    /// Loads from a TOML file when given, otherwise from the environment.
    /// The result is validated; missing credentials fail here, at start-up.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|source| AvailabilityError::ConfigFile {
                path: path.as_ref().display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content, |name| std::env::var(name).ok())
    }

    /// Parses TOML after replacing `${VAR}` with values from `lookup`.
    /// Unknown variables are left in place and later rejected by validation.
    pub fn from_toml_str(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let processed = env_placeholder().replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
        });

        toml::from_str(&processed).map_err(|e| AvailabilityError::InvalidConfiguration {
            field: "toml".to_string(),
            value: String::new(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup(ENV_TOKEN).ok_or_else(|| AvailabilityError::missing(ENV_TOKEN))?;
        let base_id = lookup(ENV_BASE_ID).ok_or_else(|| AvailabilityError::missing(ENV_BASE_ID))?;
        let timeout_seconds = match lookup(ENV_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AvailabilityError::InvalidConfiguration {
                    field: ENV_TIMEOUT.to_string(),
                    value: raw.clone(),
                    reason: "expected a whole number of seconds".to_string(),
                })?,
            None => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self {
            store: StoreConfig {
                api_url: lookup(ENV_API_URL).unwrap_or_else(default_api_url),
                token,
                base_id,
                timeout_seconds,
            },
            tables: TableNames::default(),
        })
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_credential("store.token", &self.store.token)?;
        validate_credential("store.base_id", &self.store.base_id)?;
        validate_url("store.api_url", &self.store.api_url)?;
        validate_positive_number("store.timeout_seconds", self.store.timeout_seconds, 1)?;

        validate_non_empty_string("tables.chauffeurs", &self.tables.chauffeurs)?;
        validate_non_empty_string("tables.events", &self.tables.events)?;
        validate_non_empty_string("tables.availability", &self.tables.availability)?;
        Ok(())
    }
}
