use std::{fmt, time::Duration};

use crate::{
    pipeline::{GenerationSink, GenerationSource, PipelineError},
    transform,
    window::ImportWindow,
    zones::ZoneSpec,
};

/// Pipeline stage a zone was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStage {
    Fetch,
    Normalize,
    Upsert,
}

impl fmt::Display for ZoneStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Normalize => "normalize",
            Self::Upsert => "upsert",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneOutcome {
    Success { points: usize },
    Failed { stage: ZoneStage, reason: String },
}

impl ZoneOutcome {
    fn failed(stage: ZoneStage, err: PipelineError) -> Self {
        Self::Failed {
            stage,
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZoneReport {
    pub zone: ZoneSpec,
    pub outcome: ZoneOutcome,
}

/// Per-zone outcomes of one run, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub zones: Vec<ZoneReport>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &ZoneReport> {
        self.zones
            .iter()
            .filter(|z| matches!(z.outcome, ZoneOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn points_written(&self) -> usize {
        self.zones
            .iter()
            .map(|z| match z.outcome {
                ZoneOutcome::Success { points } => points,
                ZoneOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// Collapse the report into a single error if any zone failed.
    pub fn into_result(self) -> Result<Self, RunError> {
        if self.is_success() {
            return Ok(self);
        }

        let summary = self
            .failures()
            .filter_map(|z| match &z.outcome {
                ZoneOutcome::Failed { stage, reason } => Some(format!(
                    "{} ({}) at {stage}: {reason}",
                    z.zone.display_code, z.zone.query_code
                )),
                ZoneOutcome::Success { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("; ");

        Err(RunError::ZonesFailed {
            failed: self.failures().count(),
            attempted: self.zones.len(),
            summary,
        })
    }

    fn log_summary(&self) {
        for z in self.failures() {
            if let ZoneOutcome::Failed { stage, reason } = &z.outcome {
                tracing::error!(
                    zone = z.zone.display_code,
                    query_code = z.zone.query_code,
                    %stage,
                    reason = %reason,
                    "zone failed"
                );
            }
        }

        let failed = self.failures().count();
        if failed == 0 {
            tracing::info!(
                zones = self.zones.len(),
                points = self.points_written(),
                "all zones imported"
            );
        } else {
            tracing::error!(
                failed,
                attempted = self.zones.len(),
                points = self.points_written(),
                "import finished with failures"
            );
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("{failed} of {attempted} zones failed: {summary}")]
    ZonesFailed {
        failed: usize,
        attempted: usize,
        summary: String,
    },
}

/// Drives fetch → normalize → upsert for each zone in turn.
///
/// A failing zone is recorded and skipped; it never stops the remaining zones.
pub struct Runner<S, K> {
    source: S,
    sink: K,
    zones: Vec<ZoneSpec>,
    zone_delay: Duration,
}

impl<S, K> Runner<S, K>
where
    S: GenerationSource,
    K: GenerationSink,
{
    pub fn new(source: S, sink: K, zones: Vec<ZoneSpec>, zone_delay: Duration) -> Self {
        Self {
            source,
            sink,
            zones,
            zone_delay,
        }
    }

    pub async fn run(&self, window: &ImportWindow) -> RunReport {
        tracing::info!(
            start = %window.start,
            end = %window.end,
            zones = self.zones.len(),
            "import window"
        );

        let mut report = RunReport::default();

        for (i, zone) in self.zones.iter().enumerate() {
            if i > 0 && !self.zone_delay.is_zero() {
                tokio::time::sleep(self.zone_delay).await;
            }

            let outcome = self.run_zone(zone, window).await;
            report.zones.push(ZoneReport {
                zone: *zone,
                outcome,
            });
        }

        report.log_summary();
        report
    }

    async fn run_zone(&self, zone: &ZoneSpec, window: &ImportWindow) -> ZoneOutcome {
        tracing::info!(
            zone = zone.display_code,
            query_code = zone.query_code,
            "processing zone"
        );

        let series = match self.source.fetch(zone, window).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(zone = zone.display_code, error = %e, "fetch failed");
                return ZoneOutcome::failed(ZoneStage::Fetch, e);
            }
        };

        let points = match transform::series_to_points(&series, zone.display_code) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(zone = zone.display_code, error = %e, "normalization failed");
                return ZoneOutcome::failed(ZoneStage::Normalize, e);
            }
        };
        drop(series);

        match self.sink.upsert(&points).await {
            Ok(rows) => {
                tracing::info!(zone = zone.display_code, points = points.len(), rows, "zone imported");
                ZoneOutcome::Success {
                    points: points.len(),
                }
            }
            Err(e) => {
                tracing::warn!(zone = zone.display_code, error = %e, "upsert failed");
                ZoneOutcome::failed(ZoneStage::Upsert, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        sync::Mutex,
    };

    use generation_client::domain::GenerationPoint;
    use time::{macros::datetime, OffsetDateTime};

    use super::*;
    use crate::{
        civil_time::CivilTz,
        sources::{ColumnKey, RawSeries, TimeIndex},
    };

    const ZONE_A: ZoneSpec = ZoneSpec::new("FR", "FR", "10YFR-RTE------C", "Europe/Paris");
    const ZONE_B: ZoneSpec = ZoneSpec::new("NO_2", "NO2", "10YNO-2--------T", "Europe/Oslo");
    const ZONE_C: ZoneSpec = ZoneSpec::new("PL", "PL", "10YPL-AREA-----S", "Europe/Warsaw");

    type Key = (OffsetDateTime, String, String, String, String);

    fn window() -> ImportWindow {
        ImportWindow::ending_at(datetime!(2024-03-15 10:37:22 UTC), time::Duration::hours(2))
    }

    fn solar_series(value: f64) -> RawSeries {
        RawSeries {
            index: TimeIndex::Aware(vec![datetime!(2024-03-15 08:00 UTC), datetime!(2024-03-15 09:00 UTC)]),
            columns: vec![ColumnKey::Flat("Solar".to_string())],
            rows: vec![vec![Some(value)], vec![None]],
            request_tz: CivilTz::BERLIN,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        fail_zone: Option<&'static str>,
        naive_gap_zone: Option<&'static str>,
        calls: Mutex<Vec<&'static str>>,
        fetched_at: Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait::async_trait]
    impl GenerationSource for FakeSource {
        async fn fetch(&self, zone: &ZoneSpec, _window: &ImportWindow) -> Result<RawSeries, PipelineError> {
            self.calls.lock().unwrap().push(zone.display_code);
            self.fetched_at.lock().unwrap().push(tokio::time::Instant::now());

            if self.fail_zone == Some(zone.display_code) {
                return Err(PipelineError::Fetch("429 Too Many Requests".to_string()));
            }
            if self.naive_gap_zone == Some(zone.display_code) {
                return Ok(RawSeries {
                    index: TimeIndex::Naive(vec![datetime!(2024-03-31 02:00)]),
                    columns: vec![ColumnKey::Flat("Nuclear".to_string())],
                    rows: vec![vec![Some(1.0)]],
                    request_tz: CivilTz::BERLIN,
                });
            }
            Ok(solar_series(42.0))
        }
    }

    /// Emulates `generation_ts` keyed upserts.
    #[derive(Default)]
    struct MemorySink {
        fail_zone: Option<&'static str>,
        rows: Mutex<BTreeMap<Key, f64>>,
    }

    impl MemorySink {
        fn zones(&self) -> Vec<String> {
            let rows = self.rows.lock().unwrap();
            let mut zones: Vec<String> = rows.keys().map(|k| k.1.clone()).collect();
            zones.sort();
            zones.dedup();
            zones
        }
    }

    #[async_trait::async_trait]
    impl GenerationSink for MemorySink {
        async fn upsert(&self, points: &[GenerationPoint]) -> Result<u64, PipelineError> {
            if points.iter().any(|p| Some(p.bidding_zone.as_str()) == self.fail_zone) {
                return Err(PipelineError::Sink("connection refused".to_string()));
            }

            let mut rows = self.rows.lock().unwrap();
            for p in points {
                let key = (
                    p.time_utc,
                    p.bidding_zone.clone(),
                    p.fuel_type.clone(),
                    p.fuel_detail.clone(),
                    p.source.clone(),
                );
                rows.insert(key, p.value_mw);
            }
            Ok(points.len() as u64)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delay_separates_zones_but_not_the_first() {
        let delay = Duration::from_secs(5);
        let source = FakeSource {
            fail_zone: Some("NO2"),
            ..Default::default()
        };
        let runner = Runner::new(source, MemorySink::default(), vec![ZONE_A, ZONE_B, ZONE_C], delay);

        let started = tokio::time::Instant::now();
        let report = runner.run(&window()).await;

        assert_eq!(started.elapsed(), delay * 2);
        assert_eq!(report.failures().count(), 1);

        let offsets: Vec<Duration> = runner
            .source
            .fetched_at
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(started))
            .collect();
        assert_eq!(offsets, vec![Duration::ZERO, delay, delay * 2]);
    }

    #[tokio::test]
    async fn failing_fetch_is_isolated_to_its_zone() {
        let source = FakeSource {
            fail_zone: Some("NO2"),
            ..Default::default()
        };
        let runner = Runner::new(source, MemorySink::default(), vec![ZONE_A, ZONE_B, ZONE_C], Duration::ZERO);

        let report = runner.run(&window()).await;

        assert_eq!(*runner.source.calls.lock().unwrap(), vec!["FR", "NO2", "PL"]);
        assert_eq!(report.zones.len(), 3);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].zone, ZONE_B);
        assert!(matches!(
            &failures[0].outcome,
            ZoneOutcome::Failed { stage: ZoneStage::Fetch, reason } if reason.contains("429")
        ));

        assert_eq!(runner.sink.zones(), vec!["FR".to_string(), "PL".to_string()]);
        assert_eq!(report.points_written(), 2);

        match report.into_result() {
            Err(RunError::ZonesFailed { failed, attempted, summary }) => {
                assert_eq!(failed, 1);
                assert_eq!(attempted, 3);
                assert!(summary.contains("NO2 (NO_2) at fetch"));
            }
            Ok(_) => panic!("run with a failed zone must not succeed"),
        }
    }

    #[tokio::test]
    async fn all_zones_succeeding_is_a_successful_run() {
        let runner = Runner::new(
            FakeSource::default(),
            MemorySink::default(),
            vec![ZONE_A, ZONE_B, ZONE_C],
            Duration::ZERO,
        );

        let report = runner.run(&window()).await;

        assert!(report.is_success());
        assert_eq!(report.points_written(), 3);
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn sink_failure_is_recorded_at_upsert_stage() {
        let sink = MemorySink {
            fail_zone: Some("FR"),
            ..Default::default()
        };
        let runner = Runner::new(FakeSource::default(), sink, vec![ZONE_A, ZONE_C], Duration::ZERO);

        let report = runner.run(&window()).await;

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            failures[0].outcome,
            ZoneOutcome::Failed { stage: ZoneStage::Upsert, .. }
        ));
        assert_eq!(runner.sink.zones(), vec!["PL".to_string()]);
    }

    #[tokio::test]
    async fn normalization_failure_is_recorded_at_normalize_stage() {
        let source = FakeSource {
            naive_gap_zone: Some("PL"),
            ..Default::default()
        };
        let runner = Runner::new(source, MemorySink::default(), vec![ZONE_A, ZONE_C], Duration::ZERO);

        let report = runner.run(&window()).await;

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].zone, ZONE_C);
        assert!(matches!(
            failures[0].outcome,
            ZoneOutcome::Failed { stage: ZoneStage::Normalize, .. }
        ));
    }

    #[tokio::test]
    async fn rerunning_the_same_window_overwrites_rows() {
        let runner = Runner::new(FakeSource::default(), MemorySink::default(), vec![ZONE_A], Duration::ZERO);

        runner.run(&window()).await;
        runner.run(&window()).await;

        let rows = runner.sink.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.values().copied().collect::<Vec<_>>(), vec![42.0]);
    }
}
