mod generation_point;

pub use generation_point::{
    GenerationPoint, StoredGeneration, DEFAULT_FUEL_DETAIL, SOURCE_NAME, UNKNOWN_FUEL_TYPE,
};
