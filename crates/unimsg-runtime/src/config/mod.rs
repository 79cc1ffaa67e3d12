//! Configuration for hosts embedding the message and command layers.
//!
//! The file has two sections, `logging` and `command`. Every key is optional.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig, UniConfig,
};
pub use validation::validate_config;
