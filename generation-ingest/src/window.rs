use time::{Duration, OffsetDateTime, Time, UtcOffset};

/// UTC request window for one import run.
///
/// `end` is the top of the current hour; `start` is `end - lookback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl ImportWindow {
    pub fn ending_at(now: OffsetDateTime, lookback: Duration) -> Self {
        let now = now.to_offset(UtcOffset::UTC);
        let end = now.replace_time(Time::MIDNIGHT) + Duration::hours(i64::from(now.hour()));

        Self {
            start: end - lookback,
            end,
        }
    }

    /// Window ending at the current wall-clock hour.
    pub fn trailing(lookback: Duration) -> Self {
        Self::ending_at(OffsetDateTime::now_utc(), lookback)
    }

    pub fn lookback(&self) -> Duration {
        self.end - self.start
    }
}
