//! Generation settings.
//!
//! Settings can be written by hand as YAML and overridden from the command
//! line.
//!
//! # Example YAML
//!
//! ```yaml
//! layout:
//!   width: 80
//!   style: roomy
//! stamp_version: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::LayoutConfig;

/// Errors reading or writing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A layout width too small to hold any text.
    #[error("layout width must be at least {min}, got {width}")]
    WidthTooSmall { width: usize, min: usize },
}

/// Narrowest accepted layout width.
pub const MIN_WIDTH: usize = 20;

/// Settings for one generation run.
///
/// # Examples
///
/// ```
/// use clapdoc_codegen::{GenerateConfig, LayoutStyle};
///
/// let config = GenerateConfig::from_yaml_str("layout:\n  style: roomy\n").unwrap();
/// assert_eq!(config.layout.style, LayoutStyle::Roomy);
/// assert_eq!(config.layout.width, 90);
/// assert!(!config.stamp_version);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Help text layout.
    pub layout: LayoutConfig,
    /// Include the generator version in the header comment.
    pub stamp_version: bool,
}

impl GenerateConfig {
    /// Parses configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if parsing fails, or
    /// [`ConfigError::WidthTooSmall`] for an unusable width.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Rejects settings the generator cannot honor.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.layout.width < MIN_WIDTH {
            return Err(ConfigError::WidthTooSmall {
                width: self.layout.width,
                min: MIN_WIDTH,
            });
        }
        Ok(self)
    }
}
