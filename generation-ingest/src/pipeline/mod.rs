mod runner;

use generation_client::domain::GenerationPoint;

use crate::{sources::RawSeries, window::ImportWindow, zones::ZoneSpec};

pub use runner::{RunError, RunReport, Runner, ZoneOutcome, ZoneReport, ZoneStage};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
}

/// Produces one zone's raw generation table for a window.
#[async_trait::async_trait]
pub trait GenerationSource: Send + Sync {
    async fn fetch(&self, zone: &ZoneSpec, window: &ImportWindow) -> Result<RawSeries, PipelineError>;
}

/// Persists normalized points. Either every point is written or none is.
#[async_trait::async_trait]
pub trait GenerationSink: Send + Sync {
    /// Returns the number of rows the store reported as written.
    async fn upsert(&self, points: &[GenerationPoint]) -> Result<u64, PipelineError>;
}
