//! Engine settings parsed from TOML text.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::MAX_PLY;

/// Errors raised while reading an [`EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A field parsed but holds a value the engine cannot use.
    #[error("Invalid config value for `{field}`: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

/// Search settings shared by both players of a [`Game`](crate::Game).
///
/// Every field is optional in the TOML text:
///
/// ```toml
/// depth = 6
/// move_time_ms = 500
/// quiescence_checks = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal search depth in plies.
    pub depth: u32,
    /// Wall-clock budget per move. With a budget the search deepens
    /// iteratively up to `depth` and stops between root moves.
    pub move_time_ms: Option<u64>,
    /// Whether quiescence also follows quiet checking moves.
    pub quiescence_checks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            depth: 4,
            move_time_ms: None,
            quiescence_checks: true,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] on malformed TOML and
    /// [`ConfigError::InvalidValue`] when the depth is zero or too deep.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 || self.depth as usize > MAX_PLY {
            return Err(ConfigError::InvalidValue {
                field: "depth",
                reason: format!("must be between 1 and {}", MAX_PLY),
            });
        }
        if self.move_time_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "move_time_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn move_time(&self) -> Option<Duration> {
        self.move_time_ms.map(Duration::from_millis)
    }
}
