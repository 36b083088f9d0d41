use generation_client::domain::{GenerationPoint, DEFAULT_FUEL_DETAIL, SOURCE_NAME, UNKNOWN_FUEL_TYPE};
use time::{OffsetDateTime, UtcOffset};

use crate::{
    pipeline::PipelineError,
    sources::{ColumnKey, RawSeries, TimeIndex},
};

/// Trimmed fuel type, or `UnknownFuel` when absent or blank.
pub fn normalize_fuel_type(raw: Option<&str>) -> String {
    normalize_label(raw, UNKNOWN_FUEL_TYPE)
}

/// Trimmed fuel detail, or `Unknown` when absent or blank.
pub fn normalize_fuel_detail(raw: Option<&str>) -> String {
    normalize_label(raw, DEFAULT_FUEL_DETAIL)
}

fn normalize_label(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}

/// `(fuel_type, fuel_detail)` for a column.
fn column_fuel(column: &ColumnKey) -> (String, String) {
    match column {
        ColumnKey::Flat(fuel_type) => (
            normalize_fuel_type(Some(fuel_type.as_str())),
            DEFAULT_FUEL_DETAIL.to_string(),
        ),
        ColumnKey::Composite(fuel_type, fuel_detail) => (
            normalize_fuel_type(fuel_type.as_deref()),
            normalize_fuel_detail(fuel_detail.as_deref()),
        ),
    }
}

fn utc_index(series: &RawSeries) -> Result<Vec<OffsetDateTime>, PipelineError> {
    match &series.index {
        TimeIndex::Aware(ts) => Ok(ts.iter().map(|t| t.to_offset(UtcOffset::UTC)).collect()),
        TimeIndex::Naive(ts) => ts
            .iter()
            .map(|t| series.request_tz.localize(*t))
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::Transform(e.to_string())),
    }
}

/// Flatten a wide per-zone table into one point per reported cell.
///
/// Absent and NaN cells are skipped. Output order is index order, then
/// column order.
pub fn series_to_points(series: &RawSeries, bidding_zone: &str) -> Result<Vec<GenerationPoint>, PipelineError> {
    if series.is_empty() {
        tracing::warn!(zone = bidding_zone, "no data returned");
        return Ok(Vec::new());
    }

    if series.rows.len() != series.index.len() {
        return Err(PipelineError::Transform(format!(
            "{} value rows for {} timestamps",
            series.rows.len(),
            series.index.len()
        )));
    }
    if let Some((i, row)) = series
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != series.columns.len())
    {
        return Err(PipelineError::Transform(format!(
            "row {i} has {} cells for {} columns",
            row.len(),
            series.columns.len()
        )));
    }

    let instants = utc_index(series)?;
    let fuels: Vec<(String, String)> = series.columns.iter().map(column_fuel).collect();

    let mut points = Vec::new();
    for (time_utc, row) in instants.into_iter().zip(&series.rows) {
        for ((fuel_type, fuel_detail), cell) in fuels.iter().zip(row) {
            let Some(value_mw) = cell.filter(|v| !v.is_nan()) else {
                continue;
            };

            points.push(GenerationPoint {
                time_utc,
                bidding_zone: bidding_zone.to_string(),
                fuel_type: fuel_type.clone(),
                fuel_detail: fuel_detail.clone(),
                value_mw,
                source: SOURCE_NAME.to_string(),
            });
        }
    }

    tracing::info!(
        zone = bidding_zone,
        timestamps = series.index.len(),
        columns = series.columns.len(),
        points = points.len(),
        "converted raw series to points"
    );

    Ok(points)
}
