//! Compiler configuration.
//!
//! Loaded in layers: built-in defaults, then an optional TOML file, then
//! `LIQUID_ROBOT_`-prefixed environment variables (`__` separates nested keys).
//!
//! ```no_run
//! use liquid_robot::CompilerConfig;
//!
//! let config = CompilerConfig::load_from("liquid-robot.toml")?;
//! let keys = config.key_generator();
//! # Ok::<(), liquid_robot::Error>(())
//! ```

use crate::command::{KeyGenerator, SequentialKeys, UuidKeys};
use crate::errors::{Error, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How command keys are generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    #[default]
    Uuid,
    Sequential,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Attach scripting text to every timeline frame.
    pub emit_python: bool,
    pub keys: KeyStrategy,
    /// Prefix for sequential keys.
    pub key_prefix: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            emit_python: true,
            keys: KeyStrategy::Uuid,
            key_prefix: "cmd".to_string(),
        }
    }
}

const ENV_PREFIX: &str = "LIQUID_ROBOT_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl CompilerConfig {
    /// Defaults overlaid with the environment.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment())
    }

    /// Defaults overlaid with `path` (skipped if missing), then the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::extract(
            Figment::from(Serialized::defaults(Self::default()))
                .merge(Toml::file(path.as_ref()))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::InvalidConfig(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.keys == KeyStrategy::Sequential && self.key_prefix.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "key_prefix must not be empty for sequential keys".to_string(),
            ));
        }
        Ok(())
    }

    pub fn key_generator(&self) -> Box<dyn KeyGenerator> {
        match self.keys {
            KeyStrategy::Uuid => Box::new(UuidKeys),
            KeyStrategy::Sequential => Box::new(SequentialKeys::new(self.key_prefix.clone())),
        }
    }
}
