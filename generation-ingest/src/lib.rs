pub mod civil_time;
pub mod config;
pub mod job;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod transform;
pub mod window;
pub mod zones;

pub use pipeline::{RunReport, Runner, ZoneOutcome};
pub use window::ImportWindow;
pub use zones::{ZoneSpec, ZONES};
