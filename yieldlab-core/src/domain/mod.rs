//! Domain types for YieldLab

pub mod bar;
pub mod ids;
pub mod record;

pub use bar::DayBar;
pub use ids::{ContentHash, IngestStamp};
pub use record::{ForwardReturnRecord, RecordKey};
