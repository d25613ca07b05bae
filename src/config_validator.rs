use crate::config::Config;
use crate::error::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the full service configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_base_url(&config.gbif_base_url)?;
        Self::validate_load_shedding(config.upstream_error_threshold, config.upstream_backoff_seconds)?;
        Self::validate_cache_ttl(config.cache_ttl_seconds)?;
        Self::validate_timeouts(config.gbif_timeout_seconds, config.request_timeout_seconds)?;
        Self::validate_log_level(&config.log_level)?;
        Self::validate_cors_origins(&config.cors_origins)?;
        Ok(())
    }

    /// Validates the upstream base URL
    pub fn validate_base_url(url: &str) -> Result<(), ConfigError> {
        if url.is_empty() {
            return Err(ConfigError::Invalid("GBIF base URL cannot be empty".to_string()));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "GBIF base URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_load_shedding(threshold: u32, backoff_secs: u64) -> Result<(), ConfigError> {
        if threshold == 0 {
            return Err(ConfigError::Invalid(
                "Upstream error threshold must be greater than 0".to_string(),
            ));
        }

        if backoff_secs == 0 {
            return Err(ConfigError::Invalid(
                "Upstream backoff must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The TTL doubles as the sweep interval, which must be positive
    pub fn validate_cache_ttl(ttl_secs: u64) -> Result<(), ConfigError> {
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "Cache TTL must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_timeouts(gbif_secs: u64, request_secs: u64) -> Result<(), ConfigError> {
        if gbif_secs == 0 || request_secs == 0 {
            return Err(ConfigError::Invalid(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        // Upstream deadlines must fire before the request deadline to reach the shedder
        if request_secs <= gbif_secs {
            return Err(ConfigError::Invalid(format!(
                "Request timeout ({}s) must be longer than the GBIF timeout ({}s)",
                request_secs, gbif_secs
            )));
        }

        Ok(())
    }

    pub fn validate_log_level(level: &str) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: {:?}",
                level, LOG_LEVELS
            )));
        }

        Ok(())
    }

    pub fn validate_cors_origins(origins: &[String]) -> Result<(), ConfigError> {
        if origins.is_empty() || origins.iter().any(|origin| origin.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "CORS origins cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
