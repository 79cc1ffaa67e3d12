//! Configuration validation utilities.

use std::collections::HashSet;

use unimsg_alconna::{CommandConfig, CompletionConfig};

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, UniConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &UniConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_command_config(&config.command)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }
    if let Some(target) = logging.filters.keys().find(|k| k.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {target:?}"
        )));
    }
    Ok(())
}

fn validate_command_config(command: &CommandConfig) -> ConfigResult<()> {
    let threshold = command.fuzzy_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::validation(format!(
            "command.fuzzy_threshold must be in (0, 1], got {threshold}"
        )));
    }
    validate_completion_config(&command.completion)
}

/// Validates completion settings.
///
/// Control tokens are matched against whole reply tokens, so they must be
/// non-empty, free of whitespace and pairwise distinct.
fn validate_completion_config(completion: &CompletionConfig) -> ConfigResult<()> {
    if completion.timeout_secs == 0 {
        return Err(ConfigError::validation(
            "command.completion.timeout_secs must be greater than 0",
        ));
    }

    if completion.max_rounds == 0 {
        return Err(ConfigError::validation(
            "command.completion.max_rounds must be greater than 0",
        ));
    }

    let tokens = [
        ("tab", &completion.tab),
        ("enter", &completion.enter),
        ("exit", &completion.exit),
    ];
    let mut seen = HashSet::new();
    for (field, token) in tokens {
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "command.completion.{field} must be a non-empty word, got {token:?}"
            )));
        }
        if !seen.insert(token.as_str()) {
            return Err(ConfigError::validation(format!(
                "command.completion.{field} collides with another control token: {token:?}"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&UniConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = UniConfig::default();
        config.command.completion.timeout_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_zero_rounds() {
        let mut config = UniConfig::default();
        config.command.completion.max_rounds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_control_tokens() {
        let mut config = UniConfig::default();
        config.command.completion.enter = String::new();
        assert!(validate_config(&config).is_err());

        let mut config = UniConfig::default();
        config.command.completion.tab = ". tab".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = UniConfig::default();
        config.command.completion.exit = config.command.completion.tab.clone();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("command.completion.exit collides"));
    }

    #[test]
    fn test_fuzzy_threshold_bounds() {
        let cases = [(0.0, false), (-0.5, false), (0.01, true), (1.0, true), (1.5, false)];
        for (threshold, ok) in cases {
            let mut config = UniConfig::default();
            config.command.fuzzy_threshold = threshold;
            assert_eq!(validate_config(&config).is_ok(), ok, "{threshold}");
        }

        let mut config = UniConfig::default();
        config.command.fuzzy_threshold = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = UniConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("logs/unimsg.log"));
        assert!(validate_config(&config).is_ok());
    }
}
