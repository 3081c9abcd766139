//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{GantryConfig, LogOutput, LoggingConfig, SourceConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &GantryConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_source_config(&config.source)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for module in logging.filters.keys() {
        let module = module.trim();
        if module.is_empty() {
            return Err(ConfigError::validation("Log filter module name cannot be empty"));
        }
        if module.contains(|c: char| c.is_whitespace() || c == '=' || c == ',') {
            return Err(ConfigError::validation(format!(
                "Invalid log filter module name: {module}"
            )));
        }
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "File log output requires logging.file_path",
        ));
    }

    Ok(())
}

/// Validates event source settings.
fn validate_source_config(source: &SourceConfig) -> ConfigResult<()> {
    if source.max_event_bytes == 0 {
        return Err(ConfigError::validation(
            "source.max_event_bytes must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&GantryConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_event_size() {
        let mut config = GantryConfig::default();
        config.source.max_event_bytes = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_bad_filter_key() {
        let mut config = GantryConfig::default();
        config
            .logging
            .filters
            .insert("gantry core".to_string(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());

        let mut config = GantryConfig::default();
        config.logging.filters.insert("  ".to_string(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = GantryConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("/tmp/gantry.log"));
        assert!(validate_config(&config).is_ok());
    }
}
