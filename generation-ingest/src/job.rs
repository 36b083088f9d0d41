//! Wiring shared by the import binaries.

use anyhow::Context;

use crate::{
    config::AppConfig,
    pipeline::{RunReport, Runner},
    sinks::TimescaleGenerationSink,
    sources::{EntsoeClient, EntsoeGenerationSource},
    window::ImportWindow,
};

/// Import the trailing `lookback` for every configured zone.
///
/// Returns an error naming every failed zone once all zones were attempted.
pub async fn run_import(cfg: &AppConfig, lookback: time::Duration) -> anyhow::Result<RunReport> {
    let client = EntsoeClient::new(
        cfg.entsoe.api_token.clone(),
        cfg.entsoe.base_url.clone(),
        cfg.request_timeout(),
    )
    .context("building ENTSO-E client")?;
    let source = EntsoeGenerationSource::new(client, cfg.tz_policy()?);

    let sink = TimescaleGenerationSink::new(
        cfg.pg_connect_options()?,
        cfg.database.batch_size,
        cfg.connect_timeout(),
    );

    let runner = Runner::new(source, sink, cfg.zones()?, cfg.zone_delay());
    let window = ImportWindow::trailing(lookback);

    let report = runner.run(&window).await.into_result()?;
    Ok(report)
}
