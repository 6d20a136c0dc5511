//! Application configuration types.
//!
//! `AppConfig` is built once at startup (defaults, then `config.toml`, then
//! environment overrides) and handed by reference to the constructors that
//! need it. Every field has a default so an empty file is valid.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Label reported by `GET /`.
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_platform() -> String {
    "threadkeep".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            platform: default_platform(),
        }
    }
}

/// Remote model settings.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Never serialized; usually supplied via `GOOGLE_API_KEY`.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model_timeout_secs() -> u64 {
    60
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_model_timeout_secs(),
            temperature: None,
            max_output_tokens: None,
            system_prompt: None,
        }
    }
}

/// Which transcript backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// SQLite file (durable across restarts).
    #[default]
    Sqlite,
    /// Process memory only.
    Memory,
}

/// Conversation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// SQLite URL. Defaults to `{data_dir}/threadkeep.db` when absent.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Sliding expiration window.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on any single backend call.
    #[serde(default = "default_storage_timeout_ms")]
    pub timeout_ms: u64,

    /// Keep only the newest N turns per session. Unbounded when absent.
    #[serde(default)]
    pub max_turns: Option<usize>,

    /// How often the server purges expired transcripts.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_storage_timeout_ms() -> u64 {
    5_000
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl StorageConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            database_url: None,
            ttl_secs: default_ttl_secs(),
            timeout_ms: default_storage_timeout_ms(),
            max_turns: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// What the chat handler does when the store fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageErrorPolicy {
    /// Fail the request with a storage error.
    #[default]
    Fail,
    /// Answer without memory and report the degradation.
    Degrade,
}

/// Chat handler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Hold a per-session lock around read-history, call-model, append.
    #[serde(default = "default_true")]
    pub serialize_sessions: bool,

    #[serde(default)]
    pub on_storage_error: StorageErrorPolicy,

    /// Session used by the tool transport when the caller names none.
    #[serde(default = "default_workspace")]
    pub default_workspace: String,
}

fn default_true() -> bool {
    true
}

fn default_workspace() -> String {
    "default_workspace".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            serialize_sessions: true,
            on_storage_error: StorageErrorPolicy::default(),
            default_workspace: default_workspace(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.model, "gemini-1.5-flash");
        assert!(config.model.api_key.is_none());
        assert_eq!(config.storage.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.storage.backend, StorageBackendKind::Sqlite);
        assert!(config.storage.max_turns.is_none());
        assert!(config.chat.serialize_sessions);
        assert_eq!(config.chat.on_storage_error, StorageErrorPolicy::Fail);
        assert_eq!(config.chat.default_workspace, "default_workspace");
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.timeout_ms, 5_000);
    }

    #[test]
    fn test_deserialize_with_values() {
        let toml_str = r#"
[server]
port = 9000
platform = "Railway"

[model]
api_key = "key-123"
model = "gemini-2.0-flash"
timeout_secs = 30

[storage]
backend = "memory"
ttl_secs = 600
max_turns = 40

[chat]
on_storage_error = "degrade"
serialize_sessions = false
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.platform, "Railway");
        assert_eq!(
            config.model.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("key-123".to_string())
        );
        assert_eq!(config.model.timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.storage.ttl_secs, 600);
        assert_eq!(config.storage.max_turns, Some(40));
        assert_eq!(config.chat.on_storage_error, StorageErrorPolicy::Degrade);
        assert!(!config.chat.serialize_sessions);
    }

    #[test]
    fn test_empty_api_key_is_none() {
        let config: AppConfig = toml::from_str("[model]\napi_key = \"\"").unwrap();
        assert!(config.model.api_key.is_none());
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let config: AppConfig = toml::from_str("[model]\napi_key = \"super-secret\"").unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
