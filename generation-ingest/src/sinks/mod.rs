pub mod timescale;

pub use timescale::{TimescaleGenerationSink, DEFAULT_BATCH_SIZE};
