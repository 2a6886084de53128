//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI flags / environment (ConfigOverrides)
//!     → validation.rs (semantic checks, warnings)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to every connection
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - An empty endpoint or credential is a warning, not a failure

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_with_overrides, ConfigError, ConfigOverrides, LoadedConfig};
pub use schema::{LimitsConfig, ListenerConfig, ObservabilityConfig, RelayConfig, UpstreamConfig};
pub use validation::{validate_config, ValidationError, ValidationWarning};
