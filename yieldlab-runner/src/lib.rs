//! YieldLab Runner: pipeline orchestration over `yieldlab-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration (tiers, years, band, fee, run settings)
//! - Work planning into independent (tier, year) units
//! - Unit execution with retry-then-skip and a run summary
//! - A deterministic synthetic market-data source

pub mod config;
pub mod pipeline;
pub mod summary;
pub mod synthetic;
pub mod window;

pub use config::{ConfigError, PipelineConfig, RunSettings, TierConfig, YearsConfig};
pub use pipeline::{
    run_pipeline, run_pipeline_at, run_unit, run_unit_with_retry, UnitError, UnitOutcome,
};
pub use summary::{RunSummary, UnitReport, UnitStatus};
pub use synthetic::SyntheticSource;
pub use window::{plan_units, UnitPlan};
