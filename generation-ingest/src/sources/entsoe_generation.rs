use crate::{
    civil_time::TimeZonePolicy,
    pipeline::{GenerationSource, PipelineError},
    sources::{EntsoeClient, RawSeries},
    window::ImportWindow,
    zones::ZoneSpec,
};

/// Fetches actual generation per production type, one request per zone.
///
/// The window bounds are handed to the client at the zone's civil offset,
/// which sends them in UTC; the same timezone resolves any naive timestamps
/// in the response. Errors are passed through without retry.
pub struct EntsoeGenerationSource {
    client: EntsoeClient,
    tz_policy: TimeZonePolicy,
}

impl EntsoeGenerationSource {
    pub fn new(client: EntsoeClient, tz_policy: TimeZonePolicy) -> Self {
        Self { client, tz_policy }
    }
}

#[async_trait::async_trait]
impl GenerationSource for EntsoeGenerationSource {
    async fn fetch(&self, zone: &ZoneSpec, window: &ImportWindow) -> Result<RawSeries, PipelineError> {
        let tz = self
            .tz_policy
            .for_zone(zone)
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;
        let start = tz
            .to_local(window.start)
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;
        let end = tz
            .to_local(window.end)
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;

        tracing::info!(
            zone = zone.display_code,
            query_code = zone.query_code,
            %start,
            %end,
            tz = tz.name(),
            "fetching generation"
        );

        let series = self
            .client
            .query_generation(zone.eic_code, start, end, tz)
            .await
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;

        let (timestamps, columns) = series.shape();
        tracing::info!(zone = zone.display_code, timestamps, columns, "raw series received");

        Ok(series)
    }
}
