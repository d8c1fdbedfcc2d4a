//! Configuration loading from disk and the process environment.
//!
//! Precedence, lowest first: built-in defaults, optional TOML file,
//! environment variables.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Listen port.
pub const ENV_PORT: &str = "PORT";
/// `0` disables outbound certificate verification.
pub const ENV_TLS_REJECT_UNAUTHORIZED: &str = "TLS_REJECT_UNAUTHORIZED";
/// Alias of [`ENV_TLS_REJECT_UNAUTHORIZED`] kept for existing deployments.
pub const ENV_NODE_TLS_REJECT_UNAUTHORIZED: &str = "NODE_TLS_REJECT_UNAUTHORIZED";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "PROXY_CONNECT_TIMEOUT_MS";
pub const ENV_RESPONSE_TIMEOUT_MS: &str = "PROXY_RESPONSE_TIMEOUT_MS";
/// Comma separated allow-list; unset or empty keeps the proxy open.
pub const ENV_ALLOWED_HOSTS: &str = "PROXY_ALLOWED_HOSTS";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Invalid value for {}: {:?}", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: optional TOML file, then process environment, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_PORT) {
        config.listener.port = parse_env(ENV_PORT, value)?;
    }

    let tls_toggle = lookup(ENV_TLS_REJECT_UNAUTHORIZED)
        .or_else(|| lookup(ENV_NODE_TLS_REJECT_UNAUTHORIZED));
    if let Some(value) = tls_toggle {
        // Anything but "0" keeps verification on.
        config.tls.reject_unauthorized = value.trim() != "0";
    }

    if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
        config.timeouts.connect_ms = parse_env(ENV_CONNECT_TIMEOUT_MS, value)?;
    }
    if let Some(value) = lookup(ENV_RESPONSE_TIMEOUT_MS) {
        config.timeouts.response_ms = parse_env(ENV_RESPONSE_TIMEOUT_MS, value)?;
    }

    if let Some(value) = lookup(ENV_ALLOWED_HOSTS) {
        config.policy.allowed_hosts = value
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
