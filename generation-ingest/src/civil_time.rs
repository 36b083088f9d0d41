use chrono::{LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::zones::ZoneSpec;

#[derive(thiserror::Error, Debug)]
pub enum CivilTimeError {
    #[error("unknown timezone '{0}'")]
    UnknownTimeZone(String),
    #[error("local time {local} does not exist in {tz}")]
    NonexistentLocalTime { local: PrimitiveDateTime, tz: Tz },
    #[error("timestamp out of supported range: {0}")]
    OutOfRange(String),
}

/// An IANA civil timezone used to express request windows in market-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTz(Tz);

impl CivilTz {
    pub const BERLIN: CivilTz = CivilTz(chrono_tz::Europe::Berlin);

    pub fn parse(name: &str) -> Result<Self, CivilTimeError> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| CivilTimeError::UnknownTimeZone(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// The same instant, expressed at this zone's offset.
    pub fn to_local(&self, instant: OffsetDateTime) -> Result<OffsetDateTime, CivilTimeError> {
        let utc = instant.to_offset(UtcOffset::UTC);
        let naive = to_chrono(PrimitiveDateTime::new(utc.date(), utc.time()))?;
        let offset = self.0.offset_from_utc_datetime(&naive).fix().local_minus_utc();
        Ok(instant.to_offset(offset_from_seconds(offset)?))
    }

    /// Attach this zone to a wall-clock time and convert it to UTC.
    ///
    /// A repeated (fall-back) wall-clock time resolves to the earlier instant.
    pub fn localize(&self, local: PrimitiveDateTime) -> Result<OffsetDateTime, CivilTimeError> {
        let naive = to_chrono(local)?;
        let instant = match self.0.offset_from_local_datetime(&naive) {
            LocalResult::Single(offset) => local.assume_offset(offset_from_seconds(offset.fix().local_minus_utc())?),
            LocalResult::Ambiguous(a, b) => {
                let first = local.assume_offset(offset_from_seconds(a.fix().local_minus_utc())?);
                let second = local.assume_offset(offset_from_seconds(b.fix().local_minus_utc())?);
                first.min(second)
            }
            LocalResult::None => {
                return Err(CivilTimeError::NonexistentLocalTime { local, tz: self.0 });
            }
        };
        Ok(instant.to_offset(UtcOffset::UTC))
    }
}

/// Which civil timezone a zone's naive timestamps are read in.
///
/// The request itself always carries the window in UTC, so the choice only
/// affects how unzoned timestamps in a response map to instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZonePolicy {
    /// One timezone for every zone, including zones whose market runs on a
    /// different offset (e.g. FI, PT, GR).
    Fixed(CivilTz),
    /// Each zone's own market timezone from the registry.
    PerZone,
}

impl TimeZonePolicy {
    pub fn for_zone(&self, zone: &ZoneSpec) -> Result<CivilTz, CivilTimeError> {
        match self {
            Self::Fixed(tz) => Ok(*tz),
            Self::PerZone => CivilTz::parse(zone.market_tz),
        }
    }
}

fn to_chrono(dt: PrimitiveDateTime) -> Result<NaiveDateTime, CivilTimeError> {
    NaiveDate::from_ymd_opt(dt.year(), u8::from(dt.month()).into(), dt.day().into())
        .and_then(|d| {
            d.and_hms_nano_opt(
                dt.hour().into(),
                dt.minute().into(),
                dt.second().into(),
                dt.nanosecond(),
            )
        })
        .ok_or_else(|| CivilTimeError::OutOfRange(dt.to_string()))
}

fn offset_from_seconds(seconds: i32) -> Result<UtcOffset, CivilTimeError> {
    UtcOffset::from_whole_seconds(seconds).map_err(|e| CivilTimeError::OutOfRange(e.to_string()))
}
