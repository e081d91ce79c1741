//! Coordinator configuration
//!
//! Values come from defaults, an optional TOML file and `WARDEN_*`
//! environment variables, in that order of precedence (later wins).

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::node::DEFAULT_SEQUENCE_WIDTH;

/// Environment variable overriding [`CoordinatorConfig::connect_timeout_ms`]
pub const ENV_CONNECT_TIMEOUT_MS: &str = "WARDEN_CONNECT_TIMEOUT_MS";
/// Environment variable overriding [`CoordinatorConfig::sequence_width`]
pub const ENV_SEQUENCE_WIDTH: &str = "WARDEN_SEQUENCE_WIDTH";

fn default_connect_timeout_ms() -> u64 {
    60_000
}

fn default_sequence_width() -> usize {
    DEFAULT_SEQUENCE_WIDTH
}

/// Configuration for connecting to a coordination service.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CoordinatorConfig {
    /// How long to wait for a session to report `Connected`
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Zero-padded width of sequential node suffixes
    #[serde(default = "default_sequence_width")]
    pub sequence_width: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            sequence_width: default_sequence_width(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_sequence_width(mut self, width: usize) -> Self {
        self.sequence_width = width;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid coordinator config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file and apply environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)?.with_env_overrides()
    }

    /// Apply `WARDEN_*` environment variables on top of the current values.
    pub fn with_env_overrides(self) -> anyhow::Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            self.connect_timeout_ms = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_CONNECT_TIMEOUT_MS, value))?;
        }
        if let Some(value) = lookup(ENV_SEQUENCE_WIDTH) {
            self.sequence_width = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_SEQUENCE_WIDTH, value))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        // u64::MAX has 20 decimal digits
        anyhow::ensure!(
            (1..=20).contains(&self.sequence_width),
            "sequence_width must be between 1 and 20, got {}",
            self.sequence_width
        );
        Ok(())
    }
}
