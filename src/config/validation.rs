use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("fetcher name may not be empty")]
    EmptyFetcherName,

    #[error("fetcher name '{0}' is reserved")]
    ReservedFetcherName(String),

    #[error("fetcher '{name}' has an empty driver")]
    EmptyDriver { name: String },

    #[error("converter timeout must be greater than zero")]
    ZeroTimeout,

    #[error("converter binary may not be empty")]
    EmptyBinary,
}

/// Startup validation; any failure here prevents the service from starting.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.converter.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout);
    }

    if config.converter.binary.is_empty() {
        return Err(ValidationError::EmptyBinary);
    }

    for (name, fetcher) in &config.fetchers {
        if name.is_empty() {
            return Err(ValidationError::EmptyFetcherName);
        }
        if name == "default" {
            return Err(ValidationError::ReservedFetcherName(name.clone()));
        }
        if fetcher.driver.is_empty() {
            return Err(ValidationError::EmptyDriver { name: name.clone() });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::FetcherConfig;

    #[test]
    fn test_valid_default_config() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.converter.timeout_secs = 0;

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroTimeout)
        ));
    }

    #[test]
    fn test_reserved_fetcher_name_rejected() {
        let mut config = Config::default();
        config.fetchers.insert(
            "default".to_string(),
            FetcherConfig {
                driver: "inline".to_string(),
                options: serde_json::Value::Null,
            },
        );

        assert!(matches!(
            validate(&config),
            Err(ValidationError::ReservedFetcherName(_))
        ));
    }

    #[test]
    fn test_empty_driver_rejected() {
        let mut config = Config::default();
        config.fetchers.insert(
            "web".to_string(),
            FetcherConfig {
                driver: String::new(),
                options: serde_json::Value::Null,
            },
        );

        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyDriver { .. })
        ));
    }
}
