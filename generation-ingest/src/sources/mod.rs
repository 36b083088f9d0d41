pub mod entsoe;
pub mod entsoe_generation;
pub mod raw_series;

pub use entsoe::{EntsoeClient, EntsoeError};
pub use entsoe_generation::EntsoeGenerationSource;
pub use raw_series::{ColumnKey, RawSeries, TimeIndex};
