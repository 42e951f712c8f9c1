//! Generator configuration.
//!
//! Loaded from TOML by the command-line tool. Every section is optional and
//! falls back to its defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::drbg::ctr::SEED_LEN;
use crate::source::{HealthThresholds, MIN_HEALTH_CUTOFF};

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[drbg]` section.
    #[serde(default)]
    pub drbg: DrbgConfig,
    /// `[health]` section.
    #[serde(default)]
    pub health: HealthConfig,
    /// `[output]` section.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Nonce construction used at instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NonceKind {
    /// Timestamp plus sequence number.
    #[default]
    Timestamp,
    /// Empty nonce.
    None,
}

/// DRBG instantiation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrbgConfig {
    /// Requested security strength in bits, rounded up at instantiation.
    pub security_strength: u32,
    /// Reseed before every generate call.
    pub prediction_resistance: bool,
    /// Personalization string mixed into the initial seed.
    pub personalization: String,
    /// Nonce construction.
    pub nonce: NonceKind,
}

impl Default for DrbgConfig {
    fn default() -> Self {
        Self {
            security_strength: 256,
            prediction_resistance: false,
            personalization: String::new(),
            nonce: NonceKind::Timestamp,
        }
    }
}

/// Entropy health test configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Run continuous health tests on the entropy source.
    pub enabled: bool,
    /// Repetition Count Test cutoff.
    pub rct_cutoff: u32,
    /// Adaptive Proportion Test window in samples.
    pub apt_window: u32,
    /// Adaptive Proportion Test cutoff.
    pub apt_cutoff: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        let thresholds = HealthThresholds::default();
        Self {
            enabled: true,
            rct_cutoff: thresholds.rct_cutoff,
            apt_window: thresholds.apt_window,
            apt_cutoff: thresholds.apt_cutoff,
        }
    }
}

impl HealthConfig {
    /// Returns the configured test cutoffs.
    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            rct_cutoff: self.rct_cutoff,
            apt_window: self.apt_window,
            apt_cutoff: self.apt_cutoff,
        }
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One lowercase hex line per request.
    #[default]
    Hex,
    /// Raw bytes.
    Raw,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Bytes produced per request.
    pub bytes_per_request: usize,
    /// Number of requests if not continuous.
    pub requests: u64,
    /// Output encoding.
    pub format: OutputFormat,
    /// Run until interrupted (true) or for a fixed number of requests (false).
    pub continuous: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bytes_per_request: 32,
            requests: 1,
            format: OutputFormat::Hex,
            continuous: false,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Security strength above 256 bits.
    #[error("invalid security strength {0} (must be at most 256 bits)")]
    InvalidStrength(u32),
    /// Zero bytes per request or zero requests.
    #[error("byte and request counts must be non-zero")]
    ZeroOutput,
    /// Personalization string longer than one seed.
    #[error("personalization string of {given} bytes exceeds {max} bytes")]
    PersonalizationTooLong {
        /// Given length in bytes.
        given: usize,
        /// Maximum length in bytes.
        max: usize,
    },
    /// A health test cutoff or window below the minimum.
    #[error("health test cutoffs and window must be at least {min}")]
    InvalidHealthCutoff {
        /// Smallest accepted value.
        min: u32,
    },
    /// Adaptive Proportion cutoff larger than its window.
    #[error("adaptive proportion cutoff {cutoff} exceeds window {window}")]
    AptCutoffExceedsWindow {
        /// Configured cutoff.
        cutoff: u32,
        /// Configured window.
        window: u32,
    },
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drbg.security_strength > 256 {
            return Err(ConfigError::InvalidStrength(self.drbg.security_strength));
        }
        if self.drbg.personalization.len() > SEED_LEN {
            return Err(ConfigError::PersonalizationTooLong {
                given: self.drbg.personalization.len(),
                max: SEED_LEN,
            });
        }
        if self.output.bytes_per_request == 0 || self.output.requests == 0 {
            return Err(ConfigError::ZeroOutput);
        }
        if self.health.enabled {
            let health = &self.health;
            let smallest = health.rct_cutoff.min(health.apt_window).min(health.apt_cutoff);
            if smallest < MIN_HEALTH_CUTOFF {
                return Err(ConfigError::InvalidHealthCutoff {
                    min: MIN_HEALTH_CUTOFF,
                });
            }
            if health.apt_cutoff > health.apt_window {
                return Err(ConfigError::AptCutoffExceedsWindow {
                    cutoff: health.apt_cutoff,
                    window: health.apt_window,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.drbg.security_strength, 256);
        assert_eq!(config.health.thresholds(), HealthThresholds::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.output.bytes_per_request, 32);
        assert_eq!(config.drbg.nonce, NonceKind::Timestamp);
    }

    #[test]
    fn test_partial_sections_parse() {
        let config = FileConfig::from_toml(
            r#"
            [drbg]
            security_strength = 128
            personalization = "node-a"
            nonce = "none"

            [output]
            format = "raw"
            requests = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.drbg.security_strength, 128);
        assert_eq!(config.drbg.nonce, NonceKind::None);
        assert!(!config.drbg.prediction_resistance);
        assert_eq!(config.output.format, OutputFormat::Raw);
        assert_eq!(config.output.requests, 4);
        assert_eq!(config.output.bytes_per_request, 32);
        assert!(config.health.enabled);
    }

    #[test]
    fn test_strength_above_256_invalid() {
        let mut config = FileConfig::default();
        config.drbg.security_strength = 384;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStrength(384))
        ));
    }

    #[test]
    fn test_long_personalization_invalid() {
        let mut config = FileConfig::default();
        config.drbg.personalization = "x".repeat(SEED_LEN + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PersonalizationTooLong { given: 49, max: 48 })
        ));
    }

    #[test]
    fn test_apt_cutoff_bounded_by_window() {
        let mut config = FileConfig::default();
        config.health.apt_cutoff = 600;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AptCutoffExceedsWindow { .. })
        ));

        config.health.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_health_cutoff_below_minimum_invalid() {
        let config = FileConfig::from_toml("[health]\nrct_cutoff = 1\n");
        assert!(matches!(
            config,
            Err(ConfigError::InvalidHealthCutoff { min: 2 })
        ));

        let config = FileConfig::from_toml("[health]\nrct_cutoff = 2\napt_window = 2\napt_cutoff = 2\n");
        assert!(config.is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = FileConfig::from_toml("[output]\nformat = \"base64\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
