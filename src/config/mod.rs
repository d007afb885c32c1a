//! Configuration management

use crate::domain::shared::{Result, SipError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix, e.g. `SIPSERDE_SIP__MAX_LINE_LENGTH=2000`
pub const ENV_PREFIX: &str = "SIPSERDE";

/// Smallest accepted line buffer; the shortest start line needs more
pub const MIN_LINE_LENGTH: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sip: SerdeConfig,
}

/// Parser and serializer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerdeConfig {
    /// Line buffer size; a start or header line plus its CR must fit
    pub max_line_length: usize,
    /// Largest accepted Content-Length, 0 means unlimited
    pub max_body_length: usize,
    /// Initial size of the serialization buffer
    pub output_buffer_capacity: usize,
    /// Cleared messages kept for reuse, 0 disables pooling
    pub pool_capacity: usize,
}

impl Default for SerdeConfig {
    fn default() -> Self {
        Self {
            max_line_length: 1000,
            max_body_length: 0,
            output_buffer_capacity: 4096,
            pool_capacity: 0,
        }
    }
}

impl SerdeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length < MIN_LINE_LENGTH {
            return Err(SipError::Config(format!(
                "max_line_length must be at least {}, got {}",
                MIN_LINE_LENGTH, self.max_line_length
            )));
        }
        Ok(())
    }

    /// True if a declared body of `length` bytes is acceptable
    pub fn accepts_body_length(&self, length: usize) -> bool {
        self.max_body_length == 0 || length <= self.max_body_length
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `SIPSERDE_*` environment
    /// variables, in that order of precedence.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Config::default())?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(
                ::config::File::from(path).format(::config::FileFormat::Toml),
            );
        }

        let config: Config = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.sip.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| SipError::Config(e.to_string()))?;
        config.sip.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SipError::Config(e.to_string()))
    }
}
