//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the service name can travel as a header value
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("service.name must not be empty")]
    EmptyServiceName,

    #[error("service.name {0:?} is not a valid header value")]
    InvalidServiceName(String),

    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("cache.default_ttl_secs must be greater than zero")]
    ZeroCacheTtl,

    #[error("messaging.topic must not be empty")]
    EmptyTopic,
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = &config.service.name;
    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    } else if HeaderValue::from_str(name).is_err() {
        errors.push(ValidationError::InvalidServiceName(name.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.cache.default_ttl_secs == 0 {
        errors.push(ValidationError::ZeroCacheTtl);
    }

    if config.messaging.topic.trim().is_empty() {
        errors.push(ValidationError::EmptyTopic);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.service.name = " ".into();
        config.listener.bind_address = "localhost".into();
        config.timeouts.request_secs = 0;
        config.cache.default_ttl_secs = 0;
        config.messaging.topic = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyServiceName,
                ValidationError::InvalidBindAddress("localhost".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::ZeroCacheTtl,
                ValidationError::EmptyTopic,
            ]
        );
    }

    #[test]
    fn test_service_name_must_be_header_safe() {
        let mut config = ServiceConfig::default();
        config.service.name = "was\nrust".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidServiceName("was\nrust".into())])
        );
    }
}
