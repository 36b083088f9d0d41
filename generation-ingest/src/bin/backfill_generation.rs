use anyhow::{bail, Context, Result};
use generation_ingest::{config::AppConfig, job, observability};

const DEFAULT_DAYS: i64 = 30;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Usage: backfill_generation [days]
    let days = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<i64>()
            .with_context(|| format!("invalid day count '{arg}'"))?,
        None => DEFAULT_DAYS,
    };
    if days <= 0 {
        bail!("day count must be positive, got {days}");
    }

    let cfg = AppConfig::load()?;
    tracing::info!(days, "starting generation backfill");

    match job::run_import(&cfg, time::Duration::days(days)).await {
        Ok(report) => {
            tracing::info!(
                zones = report.zones.len(),
                points = report.points_written(),
                "generation backfill complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = ?e, "generation backfill failed");
            Err(e)
        }
    }
}
