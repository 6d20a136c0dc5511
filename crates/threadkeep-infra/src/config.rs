//! Application configuration loader.
//!
//! Layers, lowest to highest precedence: built-in defaults, `config.toml`
//! (from `--config` or `{data_dir}/config.toml`), then environment variables.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use threadkeep_types::config::AppConfig;

use crate::sqlite::pool::data_dir;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config value {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Load configuration from file and process environment.
///
/// An explicitly named file must exist and parse. The default file is
/// optional; if it is unreadable or malformed a warning is logged and
/// defaults are used.
pub async fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_file(path).await?,
        None => {
            let path = default_config_path();
            match read_file(&path).await {
                Ok(config) => config,
                Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("No config.toml found at {}, using defaults", path.display());
                    AppConfig::default()
                }
                Err(err) => {
                    tracing::warn!("{err}, using defaults");
                    AppConfig::default()
                }
            }
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that would stall or silently disable the service.
///
/// Zero durations make `tokio::time::interval` panic or time out every
/// call, and `max_turns = 0` would store nothing.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let checks = [
        (config.storage.ttl_secs == 0, "storage.ttl_secs", "must be greater than zero"),
        (config.storage.timeout_ms == 0, "storage.timeout_ms", "must be greater than zero"),
        (
            config.storage.sweep_interval_secs == 0,
            "storage.sweep_interval_secs",
            "must be greater than zero",
        ),
        (
            config.storage.max_turns == Some(0),
            "storage.max_turns",
            "must be at least 1 (omit it for no cap)",
        ),
        (config.model.timeout_secs == 0, "model.timeout_secs", "must be greater than zero"),
    ];

    match checks.into_iter().find(|(bad, _, _)| *bad) {
        Some((_, field, reason)) => Err(ConfigError::Invalid { field, reason }),
        None => Ok(()),
    }
}

async fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply environment overrides read through `var`.
///
/// - `GOOGLE_API_KEY`, then `GEMINI_API_KEY`: model API key
/// - `THREADKEEP_DATABASE_URL`: SQLite URL
/// - `PORT`: HTTP listen port
pub fn apply_env_overrides(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("GOOGLE_API_KEY").or_else(|| non_empty("GEMINI_API_KEY")) {
        config.model.api_key = Some(SecretString::from(key));
    }

    if let Some(url) = non_empty("THREADKEEP_DATABASE_URL") {
        config.storage.database_url = Some(url);
    }

    if let Some(port) = non_empty("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn test_explicit_file_is_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("threadkeep.toml");
        tokio::fs::write(&path, "[server]\nport = 9100\n\n[storage]\nbackend = \"memory\"\n")
            .await
            .unwrap();

        let config = read_file(&path).await.unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(Some(&tmp.path().join("nope.toml"))).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, "[server\nport = ").await.unwrap();

        let err = read_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("GEMINI_API_KEY", "from-gemini"),
                ("THREADKEEP_DATABASE_URL", "sqlite:///tmp/x.db"),
                ("PORT", "8080"),
            ]),
        );

        assert_eq!(
            config.model.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("from-gemini".to_string())
        );
        assert_eq!(config.storage.database_url.as_deref(), Some("sqlite:///tmp/x.db"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_google_key_wins_over_gemini_key() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("GOOGLE_API_KEY", "google"), ("GEMINI_API_KEY", "gemini")]),
        );
        assert_eq!(
            config.model.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("google".to_string())
        );
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, env(&[("PORT", "eighty"), ("GOOGLE_API_KEY", "  ")]));
        assert_eq!(config.server.port, 8000);
        assert!(config.model.api_key.is_none());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let mut config = AppConfig::default();
        config.storage.sweep_interval_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid {
                field: "storage.sweep_interval_secs",
                ..
            })
        ));

        let mut config = AppConfig::default();
        config.storage.max_turns = Some(0);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid {
                field: "storage.max_turns",
                ..
            })
        ));

        let mut config = AppConfig::default();
        config.storage.timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.storage.max_turns = Some(1);
        assert!(validate_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_zero_sweep_interval() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("threadkeep.toml");
        tokio::fs::write(&path, "[storage]\nsweep_interval_secs = 0\n")
            .await
            .unwrap();

        let err = load_config(Some(&path)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
