// Configuration File Support
//
// This module provides configuration file parsing for the awsgate gateway.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from the XDG config directory:
// ~/.config/awsgate/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Command execution configuration
    pub execution: ExecutionConfig,

    /// Security validation configuration
    pub security: SecuritySettings,

    /// AWS CLI environment configuration
    pub aws: AwsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Command execution configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Default timeout for command execution in seconds
    pub timeout_secs: u64,

    /// Maximum output size in characters before truncation
    pub max_output_chars: usize,

    /// Maximum command invocations per second
    pub max_calls_per_second: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_output_chars: 10_000,
            max_calls_per_second: 10,
        }
    }
}

/// Security operating mode.
///
/// Strict blocks any security denial; permissive logs a warning and allows
/// execution regardless of the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    #[default]
    Strict,
    Permissive,
}

/// Security validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SecuritySettings {
    /// Operating mode (strict, permissive)
    pub mode: SecurityMode,

    /// Optional path to an external security policy file
    pub policy_file: Option<PathBuf>,
}

/// AWS CLI environment configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS profile passed through to the CLI environment
    pub profile: Option<String>,

    /// Region appended to EC2 commands that do not specify one
    pub region: Option<String>,
}

impl Config {
    /// Load configuration from the default XDG config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path.
    ///
    /// Environment variable overrides are applied after parsing and the
    /// result is validated.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            let config = Self::default().apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file from {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file from {:?}", path))?;

        let config = config.apply_env_overrides();
        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Get the default configuration file path.
    ///
    /// Returns `~/.config/awsgate/config.toml` on Linux/Mac.
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("io", "awsgate", "awsgate") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback if XDG dirs cannot be determined
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("awsgate")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values:
    /// - AWSGATE_LOG_LEVEL, AWSGATE_LOG_FORMAT
    /// - AWSGATE_TIMEOUT, AWSGATE_MAX_OUTPUT, AWSGATE_RATE_LIMIT
    /// - AWSGATE_SECURITY_MODE, AWSGATE_SECURITY_POLICY
    /// - AWS_PROFILE, AWS_REGION
    fn apply_env_overrides(mut self) -> Self {
        // Logging overrides
        if let Ok(level) = std::env::var("AWSGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("AWSGATE_LOG_FORMAT") {
            self.logging.format = format;
        }

        // Execution overrides
        if let Ok(timeout) = std::env::var("AWSGATE_TIMEOUT") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.execution.timeout_secs = timeout;
            }
        }
        if let Ok(max_output) = std::env::var("AWSGATE_MAX_OUTPUT") {
            if let Ok(max_output) = max_output.parse::<usize>() {
                self.execution.max_output_chars = max_output;
            }
        }
        if let Ok(rate) = std::env::var("AWSGATE_RATE_LIMIT") {
            if let Ok(rate) = rate.parse::<u32>() {
                self.execution.max_calls_per_second = rate;
            }
        }

        // Security overrides
        if let Ok(mode) = std::env::var("AWSGATE_SECURITY_MODE") {
            match mode.to_ascii_lowercase().as_str() {
                "strict" => self.security.mode = SecurityMode::Strict,
                "permissive" => self.security.mode = SecurityMode::Permissive,
                other => {
                    tracing::warn!("Unknown AWSGATE_SECURITY_MODE '{}', keeping {:?}", other, self.security.mode)
                }
            }
        }
        if let Ok(policy) = std::env::var("AWSGATE_SECURITY_POLICY") {
            self.security.policy_file = Some(PathBuf::from(policy));
        }

        // AWS environment
        if let Ok(profile) = std::env::var("AWS_PROFILE") {
            self.aws.profile = Some(profile);
        }
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.aws.region = Some(region);
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.execution.timeout_secs == 0 {
            anyhow::bail!("execution.timeout_secs must be greater than zero");
        }
        if self.execution.timeout_secs > 3600 {
            anyhow::bail!("execution.timeout_secs must be at most 3600");
        }
        if self.execution.max_output_chars < 100 {
            anyhow::bail!("execution.max_output_chars must be at least 100");
        }
        if self.execution.max_calls_per_second == 0 {
            anyhow::bail!("execution.max_calls_per_second must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.execution.timeout_secs, 30);
        assert_eq!(config.execution.max_output_chars, 10_000);
        assert_eq!(config.execution.max_calls_per_second, 10);
        assert_eq!(config.security.mode, SecurityMode::Strict);
        assert!(config.security.policy_file.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load_from_path("/nonexistent/awsgate/config.toml").unwrap();
        assert_eq!(config.execution.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[execution]
timeout_secs = 120
max_output_chars = 5000

[security]
mode = "permissive"
"#
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.execution.timeout_secs, 120);
        assert_eq!(config.execution.max_output_chars, 5000);
        // Unspecified fields keep their defaults.
        assert_eq!(config.execution.max_calls_per_second, 10);
        assert_eq!(config.security.mode, SecurityMode::Permissive);
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        assert!(Config::load_from_path(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.execution.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tiny_output_limit() {
        let mut config = Config::default();
        config.execution.max_output_chars = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_security_mode_parses_lowercase() {
        let config: Config = toml::from_str("[security]\nmode = \"permissive\"").unwrap();
        assert_eq!(config.security.mode, SecurityMode::Permissive);
    }
}
