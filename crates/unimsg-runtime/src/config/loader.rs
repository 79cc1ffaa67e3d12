//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`unimsg.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`unimsg.yaml`, `unimsg.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`unimsg.toml` / `unimsg.yaml`)
//! 3. Environment variables (`UNIMSG_*`)
//! 4. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `UNIMSG_` prefix with `__` as separator:
//!
//! - `UNIMSG_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `UNIMSG_COMMAND__FUZZY_MATCH=true` → `command.fuzzy_match = true`
//! - `UNIMSG_COMMAND__COMPLETION__TIMEOUT_SECS=10` → `command.completion.timeout_secs = 10`
//!
//! # Example
//!
//! ```rust,ignore
//! use unimsg_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/unimsg.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::UniConfig;
use super::validation::validate_config;

/// Prefix of environment variables read by [`ConfigLoader`].
pub const ENV_PREFIX: &str = "UNIMSG_";

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Merged after every other source.
    overrides: Figment,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    ///
    /// Without any search path the current directory and the user config
    /// directory (`~/.config/unimsg` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a complete configuration over every other source.
    pub fn merge(mut self, config: UniConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Sets a single key over every other source.
    ///
    /// ```rust,ignore
    /// let config = ConfigLoader::new()
    ///     .set("command.strict", false)
    ///     .load()?;
    /// ```
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<UniConfig> {
        let figment = self.build_figment()?;
        let config: UniConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            logging_level = %config.logging.level,
            strict = config.command.strict,
            completion = config.command.completion.enabled,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Builds the figment instance with all sources.
    pub fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(UniConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("unimsg"));
        }
        paths
    }

    /// Merges the first file found, trying search paths in order and base
    /// names in order within each path.
    fn load_config_files(&self, figment: Figment) -> Figment {
        let mut base_names: Vec<&str> = Vec::new();
        #[cfg(feature = "toml-config")]
        base_names.extend(["unimsg.toml", "config.toml"]);
        #[cfg(feature = "yaml-config")]
        base_names.extend(["unimsg.yaml", "unimsg.yml", "config.yaml", "config.yml"]);

        for search_path in self.resolve_search_paths() {
            for base_name in &base_names {
                let path = search_path.join(base_name);
                if !path.exists() {
                    continue;
                }
                info!(path = %path.display(), "Loading configuration file");
                match Self::merge_config_file(figment.clone(), &path) {
                    Ok(merged) => return merged,
                    Err(err) => warn!(path = %path.display(), error = %err, "Skipping config file"),
                }
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

/// Loads configuration from the default locations and the environment.
pub fn load_config() -> ConfigResult<UniConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<UniConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, LogLevel};
    use figment::Jail;
    use unimsg_core::FallbackPolicy;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::new().without_env().load().unwrap();
            assert_eq!(config.logging.level.as_str(), "info");
            assert!(config.command.strict);
            Ok(())
        });
    }

    #[test]
    fn test_file_in_current_dir() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "unimsg.toml",
                r#"
                    [logging]
                    level = "debug"
                    format = "pretty"

                    [command]
                    fuzzy_match = true
                    fallback = "to_text"

                    [command.completion]
                    tab = ".next"
                "#,
            )?;
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.logging.format, LogFormat::Pretty);
            assert!(config.command.fuzzy_match);
            assert_eq!(config.command.fallback, FallbackPolicy::ToText);
            assert_eq!(config.command.completion.tab, ".next");
            assert_eq!(config.command.completion.exit, ".exit");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("unimsg.toml", "[command]\nstrict = true\n")?;
            jail.set_env("UNIMSG_COMMAND__STRICT", "false");
            jail.set_env("UNIMSG_COMMAND__COMPLETION__TIMEOUT_SECS", "5");
            jail.set_env("UNIMSG_LOGGING__LEVEL", "warn");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();
            assert!(!config.command.strict);
            assert_eq!(config.command.completion.timeout_secs, 5);
            assert_eq!(config.logging.level, LogLevel::Warn);
            Ok(())
        });
    }

    #[test]
    fn test_programmatic_overrides_win() {
        Jail::expect_with(|jail| {
            jail.set_env("UNIMSG_COMMAND__FUZZY_THRESHOLD", "0.9");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .set("command.fuzzy_threshold", 0.4)
                .load()
                .unwrap();
            assert_eq!(config.command.fuzzy_threshold, 0.4);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        Jail::expect_with(|_jail| {
            let err = ConfigLoader::new().file("absent.toml").load().unwrap_err();
            assert!(matches!(err, ConfigError::FileNotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("unimsg.ini", "level = debug")?;
            let err = ConfigLoader::new().file("unimsg.ini").load().unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "ini"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("unimsg.toml", "[command.completion]\ntimeout_secs = 0\n")?;
            let err = load_config_from_file("unimsg.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation { .. }));

            jail.create_file("bad.toml", "[logging]\nlevel = \"loud\"\n")?;
            let err = load_config_from_file("bad.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Extract(_)));
            Ok(())
        });
    }
}
