use crate::utils::error::{AvailabilityError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> AvailabilityError {
    AvailabilityError::InvalidConfiguration {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

/// A credential that is absent, blank, or still an unresolved `${VAR}`
/// placeholder counts as missing.
pub fn validate_credential(field_name: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() || (trimmed.starts_with("${") && trimmed.ends_with('}')) {
        return Err(AvailabilityError::missing(field_name));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("store.api_url", "https://api.airtable.com/v0").is_ok());
        assert!(validate_url("store.api_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("store.api_url", "").is_err());
        assert!(validate_url("store.api_url", "invalid-url").is_err());
        assert!(validate_url("store.api_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_credential() {
        assert!(validate_credential("store.token", "patXYZ").is_ok());
        assert!(matches!(
            validate_credential("store.token", "  "),
            Err(AvailabilityError::MissingConfiguration { .. })
        ));
        assert!(matches!(
            validate_credential("store.token", "${AIRTABLE_TOKEN}"),
            Err(AvailabilityError::MissingConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("store.timeout_seconds", 30, 1).is_ok());
        assert!(validate_positive_number("store.timeout_seconds", 0, 1).is_err());
    }
}
