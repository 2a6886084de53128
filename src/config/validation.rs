//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, address parses)
//! - Flag degraded-but-valid settings (empty endpoint or credential)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<warnings, errors>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RelayConfig;

/// A setting that makes the config unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,
    #[error("upstream.endpoint `{0}` is not an absolute http(s) URL")]
    Endpoint(String),
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// A setting the relay can run with, but only in a degraded way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationWarning {
    #[error("upstream endpoint is not set; every relayed request will fail")]
    MissingEndpoint,
    #[error("upstream API key is not set; requests are forwarded with an empty bearer token")]
    MissingApiKey,
}

/// Validate a loaded configuration.
pub fn validate_config(
    config: &RelayConfig,
) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    let upstream = &config.upstream;
    if upstream.endpoint.is_empty() {
        warnings.push(ValidationWarning::MissingEndpoint);
    } else {
        let valid = Url::parse(&upstream.endpoint)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::Endpoint(upstream.endpoint.clone()));
        }
    }
    if upstream.api_key.is_empty() {
        warnings.push(ValidationWarning::MissingApiKey);
    }
    if upstream.first_byte_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("upstream.first_byte_timeout_secs"));
    }
    if upstream.idle_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroValue("upstream.idle_timeout_secs"));
    }

    let limits = &config.limits;
    if limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("limits.max_body_size"));
    }
    if limits.max_frame_size == 0 {
        errors.push(ValidationError::ZeroValue("limits.max_frame_size"));
    }
    if limits.body_read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("limits.body_read_timeout_secs"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.upstream.endpoint = "https://api.example.com/v1/stream".into();
        config.upstream.api_key = "sk-test".into();
        config
    }

    #[test]
    fn complete_config_is_clean() {
        assert_eq!(validate_config(&configured()), Ok(vec![]));
    }

    #[test]
    fn empty_endpoint_and_key_only_warn() {
        let warnings = validate_config(&RelayConfig::default()).unwrap();
        assert_eq!(
            warnings,
            vec![ValidationWarning::MissingEndpoint, ValidationWarning::MissingApiKey]
        );
    }

    #[test]
    fn collects_every_error() {
        let mut config = configured();
        config.listener.bind_address = "not-an-address".into();
        config.listener.max_connections = 0;
        config.upstream.endpoint = "ftp://example.com".into();
        config.limits.max_frame_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroConnections));
        assert!(errors.contains(&ValidationError::ZeroValue("limits.max_frame_size")));
    }

    #[test]
    fn relative_endpoint_rejected() {
        let mut config = configured();
        config.upstream.endpoint = "/v1/stream".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::Endpoint("/v1/stream".into())]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = configured();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
