use std::collections::{BTreeMap, BTreeSet};

use reqwest::StatusCode;
use serde::{de::IgnoredAny, Deserialize};
use time::{macros::format_description, Duration, OffsetDateTime, PrimitiveDateTime};

use super::{psr_type::production_type_name, EntsoeError};
use crate::{
    civil_time::CivilTz,
    sources::{ColumnKey, RawSeries, TimeIndex},
};

const NO_MATCHING_DATA: &str = "999";

// Only the parts of the documents the import reads are modelled.

#[derive(Debug, Deserialize)]
pub(crate) struct GlMarketDocument {
    #[serde(rename = "TimeSeries", default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(rename = "inBiddingZone_Domain.mRID")]
    in_bidding_zone: Option<IgnoredAny>,
    #[serde(rename = "outBiddingZone_Domain.mRID")]
    out_bidding_zone: Option<IgnoredAny>,
    #[serde(rename = "curveType")]
    curve_type: Option<String>,
    #[serde(rename = "MktPSRType")]
    psr: Option<MktPsrType>,
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct MktPsrType {
    #[serde(rename = "psrType")]
    psr_type: String,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "timeInterval")]
    time_interval: TimeInterval,
    resolution: String,
    #[serde(rename = "Point", default)]
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct TimeInterval {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct Point {
    position: u32,
    quantity: f64,
}

#[derive(Debug, Deserialize)]
struct AcknowledgementDocument {
    #[serde(rename = "Reason", default)]
    reasons: Vec<Reason>,
}

#[derive(Debug, Deserialize)]
struct Reason {
    code: String,
    text: Option<String>,
}

/// Direction of a generation time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Flow {
    Aggregated,
    Consumption,
}

impl Flow {
    fn label(self) -> &'static str {
        match self {
            Self::Aggregated => "Actual Aggregated",
            Self::Consumption => "Actual Consumption",
        }
    }
}

/// Turn an HTTP response into a generation document or the matching error.
pub(crate) fn parse_response(status: StatusCode, body: &str) -> Result<GlMarketDocument, EntsoeError> {
    if body.contains("Acknowledgement_MarketDocument") {
        let ack: AcknowledgementDocument = quick_xml::de::from_str(body)?;
        return Err(match ack.reasons.into_iter().next() {
            Some(reason) if reason.code == NO_MATCHING_DATA => {
                EntsoeError::NoMatchingData(reason.text.unwrap_or_default())
            }
            Some(reason) => EntsoeError::Api {
                code: reason.code,
                text: reason.text.unwrap_or_default(),
            },
            None => EntsoeError::Api {
                code: status.as_u16().to_string(),
                text: "acknowledgement without reason".to_string(),
            },
        });
    }

    match status {
        StatusCode::UNAUTHORIZED => return Err(EntsoeError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => return Err(EntsoeError::RateLimited),
        s if !s.is_success() => {
            return Err(EntsoeError::Status {
                status: s.as_u16(),
                body: body.chars().take(512).collect(),
            })
        }
        _ => {}
    }

    Ok(quick_xml::de::from_str(body)?)
}

/// Reshape a generation document into a wide table.
///
/// Columns are keyed by production type. When any series reports consumption
/// (e.g. pumped storage), every column becomes `(type, "Actual Aggregated" |
/// "Actual Consumption")`. The index is limited to `[start, end]`.
pub(crate) fn generation_series(
    doc: &GlMarketDocument,
    start: OffsetDateTime,
    end: OffsetDateTime,
    request_tz: CivilTz,
) -> Result<RawSeries, EntsoeError> {
    let mut by_column: BTreeMap<(String, Flow), BTreeMap<OffsetDateTime, f64>> = BTreeMap::new();

    for series in &doc.time_series {
        let production_type = series
            .psr
            .as_ref()
            .map(|m| {
                production_type_name(&m.psr_type)
                    .map(str::to_string)
                    .unwrap_or_else(|| m.psr_type.clone())
            })
            .unwrap_or_default();

        let flow = if series.out_bidding_zone.is_some() && series.in_bidding_zone.is_none() {
            Flow::Consumption
        } else {
            Flow::Aggregated
        };

        let curve_type = series.curve_type.as_deref().unwrap_or("A01");
        let values = by_column.entry((production_type, flow)).or_default();
        for period in &series.periods {
            values.extend(period_points(period, curve_type)?);
        }
    }

    let index: BTreeSet<OffsetDateTime> = by_column
        .values()
        .flat_map(|values| values.keys().copied())
        .filter(|ts| *ts >= start && *ts <= end)
        .collect();

    let composite = by_column.keys().any(|(_, flow)| *flow == Flow::Consumption);
    let columns = by_column
        .keys()
        .map(|(production_type, flow)| {
            if composite {
                ColumnKey::Composite(Some(production_type.clone()), Some(flow.label().to_string()))
            } else {
                ColumnKey::Flat(production_type.clone())
            }
        })
        .collect();

    let rows = index
        .iter()
        .map(|ts| by_column.values().map(|values| values.get(ts).copied()).collect())
        .collect();

    Ok(RawSeries {
        index: TimeIndex::Aware(index.into_iter().collect()),
        columns,
        rows,
        request_tz,
    })
}

/// Timestamped values of one period.
///
/// Curve type `A03` omits repeated values: a point holds until the next
/// reported position or the end of the period.
fn period_points(period: &Period, curve_type: &str) -> Result<Vec<(OffsetDateTime, f64)>, EntsoeError> {
    let start = parse_instant(&period.time_interval.start)?;
    let end = parse_instant(&period.time_interval.end)?;
    let step = parse_resolution(&period.resolution)?;

    let slots = u32::try_from((end - start).whole_seconds() / step.whole_seconds())
        .map_err(|_| EntsoeError::InvalidDocument(format!("period ends before it starts: {start} > {end}")))?;

    let mut points: Vec<&Point> = period.points.iter().collect();
    points.sort_by_key(|p| p.position);
    if points.first().is_some_and(|p| p.position == 0) {
        return Err(EntsoeError::InvalidDocument("point position 0".to_string()));
    }
    if let Some(p) = points.last().filter(|p| p.position > slots) {
        return Err(EntsoeError::InvalidDocument(format!(
            "point position {} outside period {start}..{end} of {slots} slots",
            p.position
        )));
    }

    // Positions are within 1..=slots, so every slot lies inside the period.
    let slot = |position: u32| start + step * (position - 1);

    if curve_type != "A03" {
        return Ok(points.iter().map(|p| (slot(p.position), p.quantity)).collect());
    }

    let mut out = Vec::new();
    for (i, p) in points.iter().enumerate() {
        let until = points.get(i + 1).map_or(slots + 1, |next| next.position);
        out.extend((p.position..until).map(|position| (slot(position), p.quantity)));
    }
    Ok(out)
}

fn parse_resolution(resolution: &str) -> Result<Duration, EntsoeError> {
    let invalid = || EntsoeError::InvalidDocument(format!("unsupported resolution '{resolution}'"));

    let body = resolution.trim().strip_prefix("PT").ok_or_else(invalid)?;
    let step = if let Some(minutes) = body.strip_suffix('M') {
        Duration::minutes(minutes.parse().map_err(|_| invalid())?)
    } else if let Some(hours) = body.strip_suffix('H') {
        Duration::hours(hours.parse().map_err(|_| invalid())?)
    } else {
        return Err(invalid());
    };

    if step.is_positive() {
        Ok(step)
    } else {
        Err(invalid())
    }
}

/// ENTSO-E writes instants as `2024-01-01T00:00Z`, sometimes with seconds.
fn parse_instant(s: &str) -> Result<OffsetDateTime, EntsoeError> {
    let s = s.trim();
    PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]Z"))
        .or_else(|_| PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z")))
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| EntsoeError::InvalidDocument(format!("invalid timestamp '{s}': {e}")))
}
