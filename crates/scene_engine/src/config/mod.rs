//! Configuration system
//!
//! Any `Serialize + Deserialize + Default` type can be loaded from or saved to
//! `.toml` and `.ron` files through the [`Config`] trait. [`RendererSettings`]
//! carries the knobs consumed by the render state and the texture pool.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Order in which a budgeted flush visits texture profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushOrder {
    /// Always start from the first-seen profile
    InsertionOrder,
    /// Resume after the profile where the previous budgeted flush stopped
    RoundRobin,
}

/// Settings for the render state and the texture pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Per-frame time allowance for deleting orphaned textures, in milliseconds
    pub texture_flush_budget_ms: f64,
    /// Number of texture units tracked by the state
    pub max_texture_units: u32,
    /// Default `env_logger` filter
    pub log_filter: String,
    /// Profile visiting order for budgeted flushes
    pub flush_order: FlushOrder,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            texture_flush_budget_ms: 2.0,
            max_texture_units: 8,
            log_filter: "info".to_string(),
            flush_order: FlushOrder::RoundRobin,
        }
    }
}

impl RendererSettings {
    /// Flush budget in seconds
    pub fn texture_flush_budget_seconds(&self) -> f64 {
        self.texture_flush_budget_ms / 1000.0
    }
}

impl Config for RendererSettings {}
