//! Work planning: one unit per (tier, target year).

use yieldlab_core::data::YearRange;
use yieldlab_core::store::PartitionKey;
use yieldlab_core::HorizonSet;

use crate::config::{ConfigError, PipelineConfig};

/// A single independent piece of work: one tier over one target year.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitPlan {
    pub tier: String,
    pub horizons: HorizonSet,
    /// Calendar year whose rows are emitted.
    pub year: i32,
    /// Years loaded from the source so horizons can reach past December.
    pub source_years: YearRange,
}

impl UnitPlan {
    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(self.tier.clone(), self.year)
    }
}

/// Expand a configuration into units, tier-major then ascending year.
pub fn plan_units(config: &PipelineConfig) -> Result<Vec<UnitPlan>, ConfigError> {
    let mut units = Vec::new();
    for tier in &config.tiers {
        let horizons = tier.horizon_set()?;
        for year in config.years.targets().years() {
            units.push(UnitPlan {
                tier: tier.name.clone(),
                horizons: horizons.clone(),
                year,
                source_years: config.years.window(year),
            });
        }
    }
    Ok(units)
}
