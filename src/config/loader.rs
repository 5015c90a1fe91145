//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable carrying the external plaintext credential.
pub const PASSWORD_ENV: &str = "AGENTD_PASSWORD";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "IO error reading {:?}: {}", path, e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Location of the config file for a given home directory.
pub fn config_path(home: &Path) -> PathBuf {
    home.join("conf").join("agent.toml")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    let config: AgentConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the configuration for an agent home.
///
/// An explicit `path` must exist. Otherwise `<home>/conf/agent.toml` is used
/// when present and defaults apply when it is not. `home` always wins over
/// any `home` key in the file, and the environment may supply the password.
pub fn load_for_home(home: &Path, path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    let default_path = config_path(home);
    let mut config = match path {
        Some(p) => load_config(p)?,
        None if default_path.exists() => load_config(&default_path)?,
        None => {
            tracing::debug!(path = ?default_path, "No config file, using defaults");
            AgentConfig::default()
        }
    };

    config.home = home.to_path_buf();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides through the given lookup.
pub fn apply_env_overrides<F>(config: &mut AgentConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(password) = lookup(PASSWORD_ENV).filter(|p| !p.is_empty()) {
        config.credential.password = password;
    }
}
