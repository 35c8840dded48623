//! Serializable pipeline configuration.
//!
//! Loaded from TOML. Every field except `tiers` and `years` has a default, so
//! a minimal file only lists the tiers and the target years:
//!
//! ```toml
//! [years]
//! start = 2017
//! end = 2024
//!
//! [[tiers]]
//! name = "short"
//! horizons = [1, 2, 3, 4, 5]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use yieldlab_core::data::YearRange;
use yieldlab_core::returns::HorizonError;
use yieldlab_core::{HorizonSet, LimitBand, ScanParams, DEFAULT_FEE_RATE};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(String),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("no horizon tiers configured")]
    NoTiers,

    #[error("tier name must not be empty")]
    EmptyTierName,

    #[error("duplicate tier name '{0}'")]
    DuplicateTier(String),

    #[error("tier '{name}': {source}")]
    InvalidTier {
        name: String,
        #[source]
        source: HorizonError,
    },

    #[error("year range is inverted: start {start} > end {end}")]
    InvertedYears { start: i32, end: i32 },

    #[error("fee rate must be finite and in [0, 1), got {0}")]
    InvalidFee(f64),

    #[error("limit band must satisfy down < 1 < up, got up={up} down={down}")]
    InvalidBand { up: f64, down: f64 },

    #[error("run.max_attempts must be at least 1")]
    ZeroAttempts,
}

/// One named horizon group, processed as its own batch per year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub horizons: Vec<u32>,
}

impl TierConfig {
    pub fn new(name: impl Into<String>, horizons: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            horizons,
        }
    }

    pub fn horizon_set(&self) -> Result<HorizonSet, ConfigError> {
        HorizonSet::new(self.horizons.clone()).map_err(|source| ConfigError::InvalidTier {
            name: self.name.clone(),
            source,
        })
    }
}

/// Target years and how far past each one the source window reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearsConfig {
    pub start: i32,
    pub end: i32,
    /// Extra years loaded after the target year so late-year horizons resolve.
    #[serde(default = "default_lookahead")]
    pub lookahead: u32,
}

impl YearsConfig {
    /// Target years, ascending.
    pub fn targets(&self) -> YearRange {
        YearRange::new(self.start, self.end)
    }

    /// Source window for one target year: `year ..= year + lookahead`.
    pub fn window(&self, year: i32) -> YearRange {
        YearRange::new(year, year.saturating_add(self.lookahead as i32))
    }
}

impl Default for YearsConfig {
    fn default() -> Self {
        Self {
            start: 2017,
            end: 2024,
            lookahead: default_lookahead(),
        }
    }
}

/// Execution knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Run (tier, year) units on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Attempts per unit before it is reported as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Full configuration for one pipeline run.
///
/// The default limit band (1.044 / 0.956) flags any flat day moving 4.4% or
/// more against the previous close, which is tighter than the nominal
/// 10% / 5% exchange limits. Override `[limit_band]` to use exchange limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
    pub years: YearsConfig,
    #[serde(default)]
    pub limit_band: LimitBand,
    #[serde(default)]
    pub run: RunSettings,
    pub tiers: Vec<TierConfig>,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiers.is_empty() {
            return Err(ConfigError::NoTiers);
        }
        let mut seen = HashSet::new();
        for tier in &self.tiers {
            if tier.name.trim().is_empty() {
                return Err(ConfigError::EmptyTierName);
            }
            if !seen.insert(tier.name.as_str()) {
                return Err(ConfigError::DuplicateTier(tier.name.clone()));
            }
            tier.horizon_set()?;
        }
        if self.years.start > self.years.end {
            return Err(ConfigError::InvertedYears {
                start: self.years.start,
                end: self.years.end,
            });
        }
        if !self.fee_rate.is_finite() || !(0.0..1.0).contains(&self.fee_rate) {
            return Err(ConfigError::InvalidFee(self.fee_rate));
        }
        let band = self.limit_band;
        if !(band.up.is_finite() && band.down.is_finite() && band.down > 0.0)
            || band.down >= 1.0
            || band.up <= 1.0
        {
            return Err(ConfigError::InvalidBand {
                up: band.up,
                down: band.down,
            });
        }
        if self.run.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    /// Scan parameters shared by every unit.
    pub fn scan_params(&self) -> ScanParams {
        ScanParams {
            band: self.limit_band,
            fee_rate: self.fee_rate,
        }
    }

    /// Deterministic fingerprint of the configuration.
    ///
    /// Two runs with equal fingerprints computed the same quantities; useful
    /// for telling apart part files written under different settings.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
            years: YearsConfig::default(),
            limit_band: LimitBand::default(),
            run: RunSettings::default(),
            tiers: vec![
                TierConfig::new("short", vec![1, 2, 3, 4, 5]),
                TierConfig::new("middle", vec![7, 10, 12, 15, 20]),
                TierConfig::new("long", vec![30, 45, 60, 120, 250]),
            ],
        }
    }
}

fn default_fee_rate() -> f64 {
    DEFAULT_FEE_RATE
}

fn default_lookahead() -> u32 {
    1
}

fn default_parallel() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_production_tiers() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        let names: Vec<&str> = config.tiers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["short", "middle", "long"]);
        assert_eq!(config.tiers[2].horizons, vec![30, 45, 60, 120, 250]);
        assert_eq!(config.years.targets().years().count(), 8);
        assert_eq!(config.fee_rate, 0.0005);
    }

    #[test]
    fn default_roundtrips_through_toml() {
        let config = PipelineConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
[years]
start = 2020
end = 2021

[[tiers]]
name = "short"
horizons = [1, 5]
"#,
        )
        .unwrap();
        assert_eq!(config.years.lookahead, 1);
        assert_eq!(config.limit_band, LimitBand::default());
        assert!(config.run.parallel);
        assert_eq!(config.run.max_attempts, 2);
        assert_eq!(config.years.window(2020), YearRange::new(2020, 2021));
    }

    #[test]
    fn rejects_bad_configs() {
        let mut c = PipelineConfig::default();
        c.tiers.clear();
        assert!(matches!(c.validate(), Err(ConfigError::NoTiers)));

        let mut c = PipelineConfig::default();
        c.tiers[1].name = "short".into();
        assert!(matches!(c.validate(), Err(ConfigError::DuplicateTier(_))));

        let mut c = PipelineConfig::default();
        c.tiers[0].horizons = vec![1, 0];
        assert!(matches!(c.validate(), Err(ConfigError::InvalidTier { .. })));

        let mut c = PipelineConfig::default();
        c.years.start = 2025;
        assert!(matches!(c.validate(), Err(ConfigError::InvertedYears { .. })));

        let mut c = PipelineConfig::default();
        c.fee_rate = -0.1;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidFee(_))));

        let mut c = PipelineConfig::default();
        c.limit_band = LimitBand { up: 0.9, down: 1.1 };
        assert!(matches!(c.validate(), Err(ConfigError::InvalidBand { .. })));

        let mut c = PipelineConfig::default();
        c.run.max_attempts = 0;
        assert!(matches!(c.validate(), Err(ConfigError::ZeroAttempts)));
    }

    #[test]
    fn unparseable_toml_is_parse_error() {
        let err = PipelineConfig::from_toml("tiers = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn fingerprint_tracks_settings() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.fee_rate = 0.001;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
