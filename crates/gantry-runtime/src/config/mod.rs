//! Configuration for the Gantry runtime.
//!
//! Layered loading through figment (defaults, files, `GANTRY_*` environment
//! variables, programmatic overrides) plus validation of the merged result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DEFAULT_MAX_EVENT_BYTES, GantryConfig, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, SourceConfig, SpanEventConfig,
};
pub use validation::validate_config;
