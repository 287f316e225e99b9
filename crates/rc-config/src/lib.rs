//! # rc-config
//!
//! Startup configuration. Values are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/{RC_ENV}.toml` (optional)
//! 4. environment variables prefixed `RC__`, nested with `__`
//!    (e.g. `RC__STORE__BACKEND=sqlite`, `RC__STORE__SQLITE__URL=...`)
//!
//! A `.env` file is loaded into the environment first.

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which `ContentStore` implementation the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    #[serde(alias = "in-memory")]
    Memory,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log: LogSettings,
    pub store: StoreSettings,
    pub seed: SeedSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: BackendKind,
    pub page_size: usize,
    pub sqlite: SqliteSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SqliteSettings {
    /// Database URL; redacted in `Debug` output.
    #[serde(deserialize_with = "secret_string")]
    pub url: SecretString,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub bootstrap_schema: bool,
}

/// Demo content written by the binary at startup. Zero posts disables it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    pub posts: usize,
    pub comments_per_post: usize,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            page_size: 10,
            sqlite: SqliteSettings::default(),
        }
    }
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            url: SecretString::from("sqlite:rusty_comments.db".to_string()),
            max_connections: 5,
            acquire_timeout_secs: 5,
            bootstrap_schema: true,
        }
    }
}

impl Settings {
    /// Loads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        let profile = std::env::var("RC_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{profile}")).required(false))
            .add_source(env_source())
            .build()?;
        Self::from_config(config)
    }

    /// Deserializes and validates an already assembled `Config`.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "store.page_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.store.sqlite.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "store.sqlite.max_connections",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// `RC__SECTION__KEY` environment variables.
pub fn env_source() -> Environment {
    Environment::with_prefix("RC")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
