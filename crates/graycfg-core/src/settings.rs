use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use config as cfg;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable selecting the `{env}.toml` overlay.
pub const ENV_NAME_VAR: &str = "GRAYCFG_ENV";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// Emit log lines without ANSI colors
    #[serde(default)]
    pub plain: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            plain: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCacheConfig {
    /// Serve release lookups from the message-invalidated cache
    #[serde(default = "ReleaseCacheConfig::default_enabled")]
    pub enabled: bool,
    /// Upper bound of app+cluster+namespace entries cached for latest releases
    #[serde(default = "ReleaseCacheConfig::default_max_watch_keys")]
    pub max_watch_keys: usize,
    /// Upper bound of releases cached by id (gray releases)
    #[serde(default = "ReleaseCacheConfig::default_max_releases_by_id")]
    pub max_releases_by_id: usize,
}

impl ReleaseCacheConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_max_watch_keys() -> usize {
        10_000
    }

    fn default_max_releases_by_id() -> usize {
        10_000
    }
}

impl Default for ReleaseCacheConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            max_watch_keys: Self::default_max_watch_keys(),
            max_releases_by_id: Self::default_max_releases_by_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Keep bound objects in sync with configuration changes
    #[serde(default = "BindingConfig::default_auto_update")]
    pub auto_update_injected_properties: bool,
}

impl BindingConfig {
    fn default_auto_update() -> bool {
        true
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            auto_update_injected_properties: Self::default_auto_update(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: ReleaseCacheConfig,
    #[serde(default)]
    pub binding: BindingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            logging: LoggingConfig::default(),
            cache: ReleaseCacheConfig::default(),
            binding: BindingConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        "development".to_string()
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.env.trim().is_empty(), "env cannot be empty");
        anyhow::ensure!(
            self.logging.level.parse::<tracing::Level>().is_ok(),
            "logging.level '{}' is not a valid level",
            self.logging.level
        );
        anyhow::ensure!(
            self.cache.max_watch_keys > 0,
            "cache.max_watch_keys must be > 0"
        );
        anyhow::ensure!(
            self.cache.max_releases_by_id > 0,
            "cache.max_releases_by_id must be > 0"
        );
        Ok(())
    }

    /// Load settings for the environment named by `GRAYCFG_ENV`.
    pub fn load(config_dir: &Path) -> Result<Settings> {
        let env_name = env::var(ENV_NAME_VAR).unwrap_or_else(|_| Self::default_env());
        let settings = Self::load_from_sources(config_dir, &env_name)?;
        settings.validate()?;
        info!("Loaded settings for env '{}' from {:?}", settings.env, config_dir);
        Ok(settings)
    }

    /// Layer `default.toml`, `{env}.toml`, `local.toml` and `GRAYCFG__*` variables.
    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let builder = cfg::Config::builder()
            .set_default("env", env_name)
            .context("setting env default")?
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                cfg::Environment::with_prefix("GRAYCFG")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(text).context("parsing settings")?;
        settings.validate()?;
        Ok(settings)
    }
}
