use time::OffsetDateTime;

/// Value of `generation_ts.source` for rows imported from ENTSO-E.
pub const SOURCE_NAME: &str = "ENTSOE";

/// Fuel detail used when the upstream column carries no sub-category.
pub const DEFAULT_FUEL_DETAIL: &str = "Unknown";

/// Fuel type used when the upstream column label is blank.
pub const UNKNOWN_FUEL_TYPE: &str = "UnknownFuel";

/// One normalized row destined for `generation_ts`.
///
/// `(time_utc, bidding_zone, fuel_type, fuel_detail, source)` is the natural key.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationPoint {
    pub time_utc: OffsetDateTime,
    pub bidding_zone: String,
    pub fuel_type: String,
    pub fuel_detail: String,
    pub value_mw: f64,
    pub source: String,
}

impl GenerationPoint {
    pub fn natural_key(&self) -> (OffsetDateTime, &str, &str, &str, &str) {
        (
            self.time_utc,
            &self.bidding_zone,
            &self.fuel_type,
            &self.fuel_detail,
            &self.source,
        )
    }
}

/// A `generation_ts` row as read back, including the server-set `created_at`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoredGeneration {
    pub time_utc: OffsetDateTime,
    pub bidding_zone: String,
    pub fuel_type: String,
    pub fuel_detail: String,
    pub value_mw: f64,
    pub source: String,
    pub created_at: OffsetDateTime,
}
