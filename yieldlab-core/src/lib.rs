//! YieldLab Core: forward-return engine under price-limit halts.
//!
//! This crate contains the algorithmic core and its storage adapters:
//! - Domain types (day bars, forward-return records, content hashes, stamps)
//! - Limit-status classification against a configurable percentage band
//! - Anchor (base-day) resolution skipping halted limit-up entries
//! - Multi-horizon forward returns from a single fee-adjusted cost basis
//! - Per-year result assembly, parallel across instruments
//! - Market-data sources (year-partitioned Parquet, CSV) and partitioned stores

pub mod anchor;
pub mod assemble;
pub mod data;
pub mod domain;
pub mod limit;
pub mod returns;
pub mod scan;
pub mod store;

pub use assemble::{AssembledBatch, BatchStats, ResultAssembler};
pub use limit::{LimitBand, LimitStatus};
pub use returns::{HorizonSet, DEFAULT_FEE_RATE};
pub use scan::{scan_instrument, ScanParams, ScannedDay};
