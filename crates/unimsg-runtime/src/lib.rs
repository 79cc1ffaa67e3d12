//! Host-side setup for unimsg: layered configuration and logging.
//!
//! ```rust,ignore
//! use unimsg_runtime::{ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! let _guard = logging::init_from_config(&config.logging);
//!
//! let layer = on_alconna(grammar).config(config.command.clone());
//! ```

pub mod config;
pub mod logging;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, SpanEventConfig, UniConfig, load_config, load_config_from_file,
    validate_config,
};
pub use logging::{LoggingBuilder, LoggingGuard, SpanEvents, init_from_config};
