//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `DICEBOT_` environment variables (`DICEBOT_LIMITS__MAX_DICE=50`).

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::dice::FormatOptions;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "dicebot.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DICEBOT_";

/// How a critical success amplifies a part's total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalMethod {
    /// Leave the total alone
    Unknown,
    #[default]
    TimesTwo,
    /// Add an independent reroll of the same part
    RollTwice,
    /// Add the part's maximum dice result and its modifiers again
    AddMax,
}

/// What to do with a roll written as secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretMethod {
    /// Post it openly
    Ignore,
    /// Wrap it in spoiler bars
    #[default]
    Hide,
    GameMasterChannel,
    GameMasterDirect,
}

/// Bounds on what a single formula may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum dice in one part (default: 1000)
    pub max_dice: u32,
    /// Maximum sides on one die (default: 10,000)
    pub max_die_size: u32,
    /// Maximum extra dice explosions may add to one part (default: 100)
    pub explosion_cap: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dice: 1000,
            max_die_size: 10_000,
            explosion_cap: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: Limits,
    /// Applied when a test part is judged critical (default: times_two)
    pub critical_method: CriticalMethod,
    /// Applied to formulas starting with `s` / `secret` (default: hide)
    pub secret_method: SecretMethod,
    /// Show rolls lowest first (default: true)
    pub sort_ascending: bool,
    /// Mark fixed rolls with `ᶠ` (default: false)
    pub mark_fixed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            critical_method: CriticalMethod::default(),
            secret_method: SecretMethod::default(),
            sort_ascending: true,
            mark_fixed: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to load config: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Load from an explicit file, or `dicebot.toml` if it exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::Missing(p.to_path_buf())),
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: EngineConfig = Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(prefix).split("__"))
            .extract()?;

        config.validate()?;
        debug!("Loaded engine config from {}: {:?}", file.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        if limits.max_dice == 0 {
            return Err(ConfigError::Invalid("limits.max_dice must be at least 1".into()));
        }
        if limits.max_die_size == 0 {
            return Err(ConfigError::Invalid("limits.max_die_size must be at least 1".into()));
        }
        if limits.explosion_cap == 0 {
            return Err(ConfigError::Invalid("limits.explosion_cap must be at least 1".into()));
        }
        Ok(())
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            critical_method: self.critical_method,
            secret_method: self.secret_method,
            sort_ascending: self.sort_ascending,
            mark_fixed: self.mark_fixed,
        }
    }
}
