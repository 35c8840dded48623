//! Market-data sources and per-instrument grouping

pub mod csv_source;
pub mod group;
pub mod parquet_source;
pub mod provider;
pub mod schema;

pub use csv_source::CsvSource;
pub use group::{group_by_instrument, InstrumentSeries};
pub use parquet_source::ParquetSource;
pub use provider::{MarketDataSource, SourceError, YearRange};
pub use schema::{SchemaError, SourceSchema};
