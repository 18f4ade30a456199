//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::WebStorageConfig;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &WebStorageConfig) -> ConfigResult<()> {
    validate_prefix(config)?;
    validate_provider(config)?;
    Ok(())
}

fn validate_prefix(config: &WebStorageConfig) -> ConfigResult<()> {
    if config.prefix.is_empty() {
        return Err(ConfigError::invalid("prefix", "must not be empty"));
    }

    // A separator inside the prefix would let one namespace see another's keys.
    if config.prefix.contains(':') {
        return Err(ConfigError::invalid(
            "prefix",
            format!("'{}' must not contain ':'", config.prefix),
        ));
    }

    Ok(())
}

fn validate_provider(config: &WebStorageConfig) -> ConfigResult<()> {
    if config.provider.trim().is_empty() {
        return Err(ConfigError::invalid("provider", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&WebStorageConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let config = WebStorageConfig::default().with_prefix("");
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "prefix"));
    }

    #[test]
    fn test_prefix_with_separator_rejected() {
        let config = WebStorageConfig::default().with_prefix("a:b");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_provider_rejected() {
        let config = WebStorageConfig::default().with_provider("  ");
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "provider"));
    }
}
