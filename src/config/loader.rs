//! Configuration loading from disk and startup overrides.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError, ValidationWarning};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line or through the environment.
/// Each one, when present, wins over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut RelayConfig) {
        if let Some(endpoint) = self.endpoint {
            config.upstream.endpoint = endpoint;
        }
        if let Some(api_key) = self.api_key {
            config.upstream.api_key = api_key;
        }
        if let Some(bind_address) = self.bind_address {
            config.listener.bind_address = bind_address;
        }
        // Port is applied after the address so `--bind` + `--port` compose.
        if let Some(port) = self.port {
            config.listener.set_port(port);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

/// A configuration that passed validation, plus whatever it warned about.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: RelayConfig,
    pub warnings: Vec<ValidationWarning>,
}

fn parse_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let config = parse_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the startup configuration: file (or defaults), then overrides, then
/// validation.
pub fn load_with_overrides(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<LoadedConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => RelayConfig::default(),
    };
    overrides.apply(&mut config);

    let warnings = validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(LoadedConfig { config, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_file() {
        let file = write_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            endpoint = "http://localhost:3000/events"
            api_key = "sk-file"
            "#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.upstream.api_key, "sk-file");
    }

    #[test]
    fn invalid_file_reports_validation() {
        let file = write_config("[listener]\nmax_connections = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("max_connections"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let file = write_config("[listener\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn overrides_win_over_file() {
        let file = write_config(
            r#"
            [upstream]
            endpoint = "http://file.example/stream"
            api_key = "sk-file"
            "#,
        );
        let overrides = ConfigOverrides {
            api_key: Some("sk-env".into()),
            bind_address: Some("127.0.0.1:7000".into()),
            port: Some(7100),
            ..Default::default()
        };
        let loaded = load_with_overrides(Some(file.path()), overrides).unwrap();
        assert_eq!(loaded.config.upstream.endpoint, "http://file.example/stream");
        assert_eq!(loaded.config.upstream.api_key, "sk-env");
        assert_eq!(loaded.config.listener.bind_address, "127.0.0.1:7100");
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn defaults_without_file_warn() {
        let loaded = load_with_overrides(None, ConfigOverrides::default()).unwrap();
        assert_eq!(loaded.config.listener.bind_address, "0.0.0.0:8000");
        assert_eq!(loaded.warnings.len(), 2);
    }
}
