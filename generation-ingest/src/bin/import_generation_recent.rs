use anyhow::Result;
use generation_ingest::{config::AppConfig, job, observability};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    match job::run_import(&cfg, cfg.lookback()).await {
        Ok(report) => {
            tracing::info!(
                zones = report.zones.len(),
                points = report.points_written(),
                "recent generation import complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = ?e, "recent generation import failed");
            Err(e)
        }
    }
}
