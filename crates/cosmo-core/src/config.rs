use anyhow::Result;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::constants::{DEFAULT_LOG_LEVEL, DEFAULT_MAX_INSTANCES};
use crate::error::CoreError;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub calendar: CalendarConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    /// Zone used for floating times when neither the request nor the
    /// collection supplies one. There is no fallback to the host locale.
    #[serde(default)]
    pub default_timezone: Option<String>,
    /// Per-entity instance cap for expansions that have no window.
    pub max_instances: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
}

impl LoggingConfig {
    /// ## Summary
    /// The configured level as a filter for the host's subscriber.
    ///
    /// ## Errors
    /// Returns [`CoreError::InvalidInput`] for an unknown level name.
    pub fn level_filter(&self) -> Result<LevelFilter, CoreError> {
        self.level
            .parse()
            .map_err(|_e| CoreError::InvalidInput {
                setting: "logging.level",
                reason: format!("unknown level {:?}", self.level),
            })
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and `config.toml` into a `Settings`.
    /// Environment variables (`COSMO_CALENDAR__DEFAULT_TIMEZONE`, ...) take precedence.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::defaults()?
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(
                config::Environment::with_prefix("COSMO")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(config::Case::Snake)
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?
            .validated()?)
    }

    /// ## Summary
    /// Builds settings from a TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is not valid TOML or does not deserialize.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(Self::defaults()?
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?
            .validated()?)
    }

    fn validated(self) -> Result<Self, CoreError> {
        if self.calendar.max_instances == 0 {
            return Err(CoreError::InvalidInput {
                setting: "calendar.max_instances",
                reason: "must be at least 1".to_owned(),
            });
        }
        self.logging.level_filter()?;
        Ok(self)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("calendar.max_instances", i64::from(DEFAULT_MAX_INSTANCES))?
            .set_default("logging.level", DEFAULT_LOG_LEVEL)?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    if let Err(error) = dotenvy::dotenv() {
        tracing::debug!(%error, "No .env file loaded");
    }

    let settings = Settings::load()?;
    tracing::debug!(
        default_timezone = ?settings.calendar.default_timezone,
        max_instances = settings.calendar.max_instances,
        level = %settings.logging.level,
        "Configuration loaded"
    );
    Ok(settings)
}
